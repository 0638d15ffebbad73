mod common;
mod depdb_tests;
mod resolve_tests;
