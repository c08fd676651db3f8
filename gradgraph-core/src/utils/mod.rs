pub(crate) mod sync;
pub mod testing;
