//! Shared test harness modules for the placetree CLI.

use super::*;
