//! Bulls-and-cows scoring.

/// Scores `guess` against `secret`, returning `(bulls, cows)`.
///
/// For each position of the guess: a digit equal to the secret's digit at
/// the same position is a bull; otherwise, a digit that appears anywhere
/// in the secret is a cow.
///
/// Occurrences are not consumed. A guess digit that appears once in the
/// secret counts as a cow at every mismatched position it is guessed, so
/// with repeated digits `bulls + cows` can exceed the secret's length:
///
/// ```
/// use bullpen_room::evaluate;
///
/// assert_eq!(evaluate("1122", "1111"), (2, 2));
/// ```
///
/// Inputs are expected to have equal length. A guess position past the
/// end of the secret can still score a cow but never a bull.
pub fn evaluate(secret: &str, guess: &str) -> (u32, u32) {
    let secret: Vec<char> = secret.chars().collect();
    let mut bulls = 0;
    let mut cows = 0;

    for (i, g) in guess.chars().enumerate() {
        if secret.get(i) == Some(&g) {
            bulls += 1;
        } else if secret.contains(&g) {
            cows += 1;
        }
    }

    (bulls, cows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_evaluate_exact_match_is_all_bulls() {
        assert_eq!(evaluate("5678", "5678"), (4, 0));
        assert_eq!(evaluate("123", "123"), (3, 0));
    }

    #[test]
    fn test_evaluate_no_common_digits() {
        assert_eq!(evaluate("1234", "5678"), (0, 0));
    }

    #[test]
    fn test_evaluate_permutation_is_all_cows() {
        assert_eq!(evaluate("1234", "4321"), (0, 4));
        assert_eq!(evaluate("123", "231"), (0, 3));
    }

    #[test]
    fn test_evaluate_mixed() {
        // 1 bull (1), 2 cows (3 and 2 in wrong places).
        assert_eq!(evaluate("1234", "1325"), (1, 2));
    }

    #[test]
    fn test_evaluate_repeated_guess_digit_over_counts_cows() {
        // Positions 0,1 are bulls; positions 2,3 guess '1', which the
        // secret contains, so both count as cows.
        assert_eq!(evaluate("1122", "1111"), (2, 2));
        // A single '7' in the secret turns every mismatched '7' into a cow.
        assert_eq!(evaluate("7000", "0777"), (0, 4));
    }

    #[test]
    fn test_evaluate_repeated_secret_digit() {
        assert_eq!(evaluate("2222", "1234"), (1, 0));
        assert_eq!(evaluate("2200", "0022"), (0, 4));
    }

    #[test]
    fn test_evaluate_guess_longer_than_secret() {
        assert_eq!(evaluate("12", "1221"), (2, 2));
    }

    #[test]
    fn test_evaluate_matches_positional_definition_on_random_inputs() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let len = if rng.random_bool(0.5) { 3 } else { 4 };
            let secret: String = (0..len)
                .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
                .collect();
            let guess: String = (0..len)
                .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
                .collect();

            let s: Vec<char> = secret.chars().collect();
            let g: Vec<char> = guess.chars().collect();
            let want_bulls = (0..len).filter(|&i| s[i] == g[i]).count() as u32;
            let want_cows = (0..len)
                .filter(|&i| s[i] != g[i] && s.contains(&g[i]))
                .count() as u32;

            assert_eq!(
                evaluate(&secret, &guess),
                (want_bulls, want_cows),
                "secret={secret} guess={guess}"
            );
        }
    }
}
