pub mod drafts;
pub mod endpoint;
pub mod submit;
