mod common;
mod payments;
mod portal;
mod service;
