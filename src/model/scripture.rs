use rand::Rng;
use serde::Serialize;

/// A verse shown on the dashboard.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Verse {
    pub reference: &'static str,
    pub text: &'static str,
}

pub const VERSES: [Verse; 5] = [
    Verse {
        reference: "Malachi 3:10",
        text: "Bring the whole tithe into the storehouse... 'Test me in this,' says the LORD \
            Almighty.",
    },
    Verse {
        reference: "Proverbs 21:20",
        text: "The wise store up choice food and olive oil, but fools gulp theirs down.",
    },
    Verse {
        reference: "Luke 14:28",
        text: "Suppose one of you wants to build a tower. Won’t you first sit down and \
            estimate the cost?",
    },
    Verse {
        reference: "2 Corinthians 9:7",
        text: "God loves a cheerful giver.",
    },
    Verse {
        reference: "Philippians 4:11–12",
        text: "I have learned to be content whatever the circumstances...",
    },
];

/// Maps any stored index, including negative ones, onto a valid verse position.
pub fn position(index: i64) -> usize {
    // rem_euclid of a positive length is in 0..len
    index.rem_euclid(VERSES.len() as i64) as usize
}

pub fn verse(index: i64) -> &'static Verse {
    &VERSES[position(index)]
}

/// Picks a random index in `[0, 4]` that shows a different verse than `current`.
pub fn next_index(current: i64) -> i64 {
    let current = position(current);
    let offset = rand::rng().random_range(1..VERSES.len());
    ((current + offset) % VERSES.len()) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_is_always_valid() {
        assert_eq!(position(0), 0);
        assert_eq!(position(4), 4);
        assert_eq!(position(5), 0);
        assert_eq!(position(-1), 4);
        assert_eq!(position(i64::MAX), (i64::MAX % 5) as usize);
        assert_eq!(position(i64::MIN), i64::MIN.rem_euclid(5) as usize);
        assert_eq!(verse(12).reference, "Luke 14:28");
    }

    #[test]
    fn test_verse_text() {
        assert_eq!(verse(3).reference, "2 Corinthians 9:7");
        assert_eq!(verse(3).text, "God loves a cheerful giver.");
        assert_eq!(
            verse(2).text,
            "Suppose one of you wants to build a tower. Won’t you first sit down and \
            estimate the cost?"
        );
        assert_eq!(verse(4).reference, "Philippians 4:11–12");
    }

    #[test]
    fn test_next_index_from_four() {
        for _ in 0..100 {
            let next = next_index(4);
            assert!((0..=4).contains(&next));
            assert_ne!(next, 4);
        }
    }

    #[test]
    fn test_next_index_from_out_of_range() {
        for _ in 0..100 {
            let next = next_index(-3);
            assert!((0..=4).contains(&next));
            assert_ne!(next as usize, position(-3));
        }
    }
}
