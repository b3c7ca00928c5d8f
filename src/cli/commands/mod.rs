pub mod capabilities;
pub mod host;
pub mod invitation;
pub mod tier;
