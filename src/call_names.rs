//! Traditional bingo call names.
//!
//! Screens show the phrase for the latest call beneath the number. Numbers
//! outside `1..=90` have no phrase.

use crate::state::Number;

/// Highest number with a traditional call name.
pub const MAX_NAMED: Number = 90;

/// Returns the announcement phrase for `number`, if it has one.
///
/// ```
/// use bingo_relay::call_names::call_name;
///
/// assert_eq!(call_name(88), Some("Two fat ladies"));
/// assert_eq!(call_name(91), None);
/// ```
pub fn call_name(number: Number) -> Option<&'static str> {
    let name = match number {
        1 => "Kelly's eye",
        2 => "One little duck (quack)",
        3 => "Cup of tea",
        4 => "Knock at the door",
        5 => "Man alive",
        6 => "Half dozen",
        7 => "Lucky",
        8 => "Garden gate",
        9 => "Brighton line",
        10 => "Rishi's Den",
        11 => "Legs eleven",
        12 => "One dozen",
        13 => "Unlucky for some",
        14 => "Valentine's Day",
        15 => "Groovy Scene",
        16 => "Sweet 16",
        17 => "Dancing Queen",
        18 => "Coming of age",
        19 => "Goodbye, teens",
        20 => "Score",
        21 => "Key of the door",
        22 => "Two little ducks (quack quack)",
        23 => "Thee and me",
        24 => "Two dozen",
        25 => "Duck and dive",
        26 => "Pick and mix",
        27 => "Duck and a crutch",
        28 => "In a state",
        29 => "Rise and shine",
        30 => "Dirty Gertie",
        31 => "Get up and run",
        32 => "Buckle my shoe",
        33 => "Dirty knee",
        34 => "Ask for more",
        35 => "Jump and jive",
        36 => "Three dozen",
        37 => "More than 11",
        38 => "Christmas Cake",
        39 => "Steps",
        40 => "Life begins",
        41 => "Time for fun",
        42 => "Winnie the Pooh",
        43 => "Down on your knees",
        44 => "Droopy Drawers",
        45 => "Halfway there",
        46 => "Up to tricks",
        47 => "Four and seven",
        48 => "Four dozen",
        49 => "PC",
        50 => "It's a bullseye!",
        51 => "Tweak of the thumb",
        52 => "Weeks in a year",
        53 => "Stuck in the tree",
        54 => "Man at the door",
        55 => "All the fives",
        56 => "Shotts bus",
        57 => "Heinz varieties",
        58 => "Make them wait",
        59 => "Brighton line",
        60 => "Five dozen",
        61 => "Baker's bun",
        62 => "Tickety-boo",
        63 => "Tickle me",
        64 => "Red raw",
        65 => "Old age pension",
        66 => "Clickety click",
        67 => "Stairway to Heaven",
        68 => "Pick a mate",
        69 => "Anyway up",
        70 => "Three score and 10",
        71 => "Bang on the drum",
        72 => "Six dozen",
        73 => "Queen bee",
        74 => "Candy store",
        75 => "Strive and strive",
        76 => "Trombones",
        77 => "Two little crutches",
        78 => "39 more steps",
        79 => "One more time",
        80 => "Eight and blank",
        81 => "Stop and run",
        82 => "Straight on through",
        83 => "Time for tea",
        84 => "Give me more",
        85 => "Staying alive",
        86 => "Between the sticks",
        87 => "Torquay in Devon",
        88 => "Two fat ladies",
        89 => "Almost there",
        90 => "Top of the shop",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_number_in_range_has_a_name() {
        for n in 1..=MAX_NAMED {
            let name = call_name(n);
            assert!(name.is_some_and(|s| !s.is_empty()), "{n} has no name");
        }
    }

    #[test]
    fn out_of_range_numbers_have_no_name() {
        assert_eq!(call_name(0), None);
        assert_eq!(call_name(-1), None);
        assert_eq!(call_name(MAX_NAMED + 1), None);
    }

    #[test]
    fn names_are_trimmed() {
        for n in 1..=MAX_NAMED {
            if let Some(name) = call_name(n) {
                assert_eq!(name, name.trim());
            }
        }
    }
}
