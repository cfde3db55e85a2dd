#![cfg(test)]

mod corpus;
mod test_utils;
