pub mod embeds;
pub mod export;
pub mod listing;
pub mod page_source;
pub mod saver;
pub mod url;
pub mod webhook;
