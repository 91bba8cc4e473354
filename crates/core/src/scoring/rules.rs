//! Ordered rule tables. Every classifier cascade is written as a list evaluated top to
//! bottom, first match wins, so precedence is visible in one place.

pub struct Rule<I, T> {
    pub when: fn(&I) -> bool,
    pub then: T,
}

pub fn first_match<I, T: Copy>(rules: &[Rule<I, T>], input: &I, fallback: T) -> T {
    rules
        .iter()
        .find(|rule| (rule.when)(input))
        .map(|rule| rule.then)
        .unwrap_or(fallback)
}

/// Step tiers sorted by descending threshold; a value on a threshold belongs to that tier.
pub fn at_least<T: Copy>(tiers: &[(f64, T)], value: f64, fallback: T) -> T {
    tiers
        .iter()
        .find(|(min, _)| value >= *min)
        .map(|(_, tier)| *tier)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_respects_order() {
        let rules: [Rule<i32, &str>; 2] = [
            Rule {
                when: |n: &i32| *n > 0,
                then: "positive",
            },
            Rule {
                when: |n: &i32| *n > 10,
                then: "large",
            },
        ];
        assert_eq!(first_match(&rules, &20, "other"), "positive");
        assert_eq!(first_match(&rules, &-1, "other"), "other");
    }

    #[test]
    fn at_least_is_inclusive() {
        let tiers = [(10.0, 'a'), (5.0, 'b')];
        assert_eq!(at_least(&tiers, 10.0, 'z'), 'a');
        assert_eq!(at_least(&tiers, 9.99, 'z'), 'b');
        assert_eq!(at_least(&tiers, 4.0, 'z'), 'z');
    }
}
