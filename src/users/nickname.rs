use rand::{seq::SliceRandom, Rng};

const ADJECTIVES: &[&str] = &[
    "clever", "jolly", "brave", "sly", "gentle", "swift", "quiet", "bright", "lucky", "curious",
    "mighty", "nimble", "calm", "bold", "witty",
];

const ANIMALS: &[&str] = &[
    "panda", "fox", "raccoon", "koala", "lion", "otter", "falcon", "badger", "lynx", "heron",
    "beaver", "wolf", "gecko", "walrus", "owl",
];

/// Random `adjective_animal_N` handle, e.g. `clever_fox_42`.
pub fn generate_nickname() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("quiet");
    let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("owl");
    let number: u16 = rng.gen_range(0..1000);
    format!("{adjective}_{animal}_{number}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::validation::validate_nickname;

    #[test]
    fn generated_nicknames_pass_nickname_rule() {
        for _ in 0..50 {
            let nick = generate_nickname();
            assert!(validate_nickname(&nick).is_ok(), "{nick}");
            assert_eq!(nick.split('_').count(), 3);
        }
    }
}
