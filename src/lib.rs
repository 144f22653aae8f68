//! Codeprov - AST-based code provenance classification
//!
//! Converts source code in several grammars into a canonical
//! sequence-of-blocks representation, encodes it with a two-level
//! recurrent network, and classifies the result (human- vs
//! machine-authored code).

pub mod ast;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod index_tree;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod vocab;

pub use classifier::Classifier;
pub use error::Error;
