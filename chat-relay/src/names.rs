use rand::{Rng, seq::SliceRandom};

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Carmen", "Dmytro", "Elena", "Felix", "Grace", "Hugo", "Iryna", "James",
    "Kateryna", "Liam", "Maria", "Nolan", "Olena", "Pavlo", "Quinn", "Rosa", "Stepan", "Tamara",
    "Ursula", "Victor", "Wanda", "Yaroslav", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Bondarenko", "Carter", "Dovzhenko", "Evans", "Fischer", "Garcia", "Hughes",
    "Ivanenko", "Jensen", "Kovalenko", "Lopez", "Melnyk", "Novak", "Oliver", "Petrenko",
    "Reyes", "Shevchenko", "Turner", "Walsh",
];

/// Picks a random `"First Last"` display name. Collisions are possible and
/// harmless; connections are keyed by id, not by name.
pub fn random_display_name() -> String {
    display_name_with(&mut rand::thread_rng())
}

pub fn display_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Anonymous");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Guest");
    format!("{first} {last}")
}
