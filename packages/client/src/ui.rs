//! UI utilities for the CLI client.

use std::io::Write;

/// Redisplay the prompt after printing an event
pub fn redisplay_prompt(user_id: i64) {
    print!("{}> ", user_id);
    std::io::stdout().flush().ok();
}
