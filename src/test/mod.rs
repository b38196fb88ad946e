mod env;
mod submissions;
pub mod test_utils;
