mod common;
mod filter;
mod service;
