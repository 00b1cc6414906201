use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rollcore::roster::{Roster, RosterEntry};
use serde::{Deserialize, Serialize};

const CHROME: [&str; 5] = ["Unmute", "Start Video", "Share Screen", "Reactions", "More"];

/// Settings for synthesising noisy participant panels from a roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub batches: usize,
    /// Chance that a roster member is in the meeting at the start.
    pub attendance: f64,
    /// Per-batch chance that a participant joins or drops out.
    pub churn: f64,
    /// Chance that a rendered name gets an OCR-style defect.
    pub noise: f64,
    /// Participants who are not on the roster.
    pub guests: usize,
    pub chrome: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            batches: 10,
            attendance: 0.8,
            churn: 0.1,
            noise: 0.3,
            guests: 2,
            chrome: true,
        }
    }
}

fn garble(entry: &RosterEntry, host: bool, rng: &mut StdRng, noise: f64) -> String {
    let mut name = entry.canonical_name.clone();
    if rng.gen_bool(noise.clamp(0.0, 1.0)) {
        name = match rng.gen_range(0..4) {
            0 => name.to_lowercase(),
            1 => {
                let mut chars: Vec<char> = name.chars().collect();
                if chars.len() > 4 {
                    chars.pop();
                }
                chars.into_iter().collect()
            }
            2 => format!("{}. {}", entry.identifier, name),
            _ => format!("{} {}", name, entry.identifier),
        };
    }
    if host {
        name.push_str(" (Host, me)");
    }
    name
}

/// Guests carry letters, not digits, so they never look like roll numbers.
fn guest_name(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    format!("Visitor {}", letter)
}

/// Builds `config.batches` raw capture batches with joins, drops and UI noise.
pub fn build_batches(roster: &Roster, config: &GeneratorConfig) -> Vec<Vec<String>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let entries = roster.entries();
    let mut present: Vec<bool> = entries
        .iter()
        .map(|_| rng.gen_bool(config.attendance.clamp(0.0, 1.0)))
        .collect();
    let churn = config.churn.clamp(0.0, 1.0);

    (0..config.batches)
        .map(|_| {
            for flag in present.iter_mut() {
                if rng.gen_bool(churn) {
                    *flag = !*flag;
                }
            }

            let mut batch: Vec<String> = entries
                .iter()
                .zip(&present)
                .enumerate()
                .filter(|(_, (_, here))| **here)
                .map(|(index, (entry, _))| garble(entry, index == 0, &mut rng, config.noise))
                .collect();
            batch.extend((0..config.guests).map(guest_name));
            if config.chrome {
                batch.push(format!("Participants ({})", batch.len()));
                batch.extend(CHROME.iter().map(|s| s.to_string()));
            }
            batch.shuffle(&mut rng);
            batch
        })
        .collect()
}
