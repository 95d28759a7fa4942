//! Unit tests for the greenmap CLI.

use super::*;

mod commands;
mod parsing;
