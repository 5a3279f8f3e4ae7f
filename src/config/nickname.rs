//! Fallback nickname generator.
//!
//! Produces nicknames in the format `<Adjective>Bot<NN>` (e.g. `RustyBot42`)
//! for configs that leave `nickname` unset. Kept short enough for servers
//! that still enforce a small NICKLEN.

use rand::RngExt;

const ADJECTIVES: &[&str] = &[
    "Rusty", "Tiny", "Lazy", "Sly", "Odd", "Brisk", "Calm", "Grim", "Spry", "Wry", "Keen", "Bold",
];

/// Generate a random nickname like `SlyBot07`.
pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let adj = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let num: u8 = rng.random_range(0..100);
    format!("{}Bot{:02}", adj, num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_nick_is_usable() {
        for _ in 0..50 {
            let nick = generate_nickname();
            assert!(nick.len() <= 10, "{nick} too long");
            assert!(nick.contains("Bot"));
            assert!(nick.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
