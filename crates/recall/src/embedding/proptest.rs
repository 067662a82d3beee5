//! Property-based tests for the vector helpers.
//!
//! - cosine similarity is symmetric and bounded to [-1, 1]
//! - a non-zero vector is maximally similar to itself
//! - zero and mismatched vectors score 0 without panicking
