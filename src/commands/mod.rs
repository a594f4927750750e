pub mod autofixup;
