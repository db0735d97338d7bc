use crate::sequence::CommandSequence;

/// Mutation rounds every seed receives.
pub const BASE_ENERGY: u32 = 5;
/// Cap on the length-proportional bonus.
pub const MAX_LENGTH_BONUS: u32 = 5;

/// Number of mutated variants to test for `seed` in one scheduling round:
/// `5 + min(len / 2, 5)`.
pub fn assign_energy(seed: &CommandSequence) -> u32 {
    let bonus = (seed.len() / 2).min(MAX_LENGTH_BONUS as usize) as u32;
    BASE_ENERGY + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy_for(len: usize) -> u32 {
        assign_energy(&CommandSequence::new(vec![0; len]).unwrap())
    }

    #[test]
    fn test_base_energy_for_single_opcode() {
        assert_eq!(energy_for(1), 5);
    }

    #[test]
    fn test_bonus_grows_with_length() {
        assert_eq!(energy_for(2), 6);
        assert_eq!(energy_for(5), 7);
        assert_eq!(energy_for(10), 10);
    }

    #[test]
    fn test_bonus_is_capped() {
        assert_eq!(energy_for(100), 10);
        assert_eq!(energy_for(256), 10);
    }
}
