mod ballot;
mod common;
