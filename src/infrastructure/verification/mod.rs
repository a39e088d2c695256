pub mod bouncify;
