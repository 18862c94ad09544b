pub mod content;
pub mod editor;
pub mod media;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
