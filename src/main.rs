use clap::Parser;
use git_autofixup::commands::autofixup::{AutofixupArgs, handle_autofixup};

#[derive(Parser)]
#[command(name = "git-autofixup")]
#[command(about = "Fold staged hunks into the commits they fix", long_about = None)]
#[command(version)]
struct Cli {
    /// Never rewrite this ref or its ancestors (default: origin/master)
    #[arg(long, value_name = "REF")]
    rebase_limit: Option<String>,

    /// How to attribute inserted lines: above, below, around or recent
    #[arg(long, value_name = "POLICY")]
    insert_checks: Option<String>,

    /// Run as if started in <PATH>
    #[arg(short = 'C', value_name = "PATH")]
    directories: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let args = AutofixupArgs {
        rebase_limit: cli.rebase_limit,
        insert_checks: cli.insert_checks,
        directories: cli.directories,
    };

    std::process::exit(handle_autofixup(&args));
}
