//! Storage Adapter - 本地文件存储

mod file_clip_store;

pub use file_clip_store::FileClipStore;
