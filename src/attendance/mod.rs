pub mod engine;
pub mod notify;
pub mod ports;
#[cfg(test)]
pub mod testing;
