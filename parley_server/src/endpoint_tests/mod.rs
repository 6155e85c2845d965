pub mod helpers;
pub mod mocks;

mod payments;
mod webhook;
