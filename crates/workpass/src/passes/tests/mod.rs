mod common;
mod domain;
mod store;
