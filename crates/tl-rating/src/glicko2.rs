//! Glicko-2 rating math.
//!
//! μ = (Elo − 1500) / 173.7178, φ = RD / 173.7178; σ converges via the
//! Illinois variant of regula falsi on `f(x)`, matching
//! `original_source/models/elo.py::EloCalculator._compute_new_volatility`
//! exactly (a naive Newton iteration diverges near the boundary that
//! algorithm guards against).
use tl_core::Elo;

const SCALE: f64 = 173.7178;
pub const TAU: f64 = 0.5;
pub const EPSILON: f64 = 1e-6;
const DEFAULT_RD: f64 = 200.0;
const DEFAULT_VOLATILITY: f64 = 0.06;

/// A player's rating in Glicko-2 terms, with a convenience `Elo` view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub elo: Elo,
    pub rd: f64,
    pub volatility: f64,
}

impl Rating {
    pub fn new(elo: Elo) -> Self {
        Self {
            elo,
            rd: DEFAULT_RD,
            volatility: DEFAULT_VOLATILITY,
        }
    }
    pub fn mu(&self) -> f64 {
        (self.elo as f64 - 1500.0) / SCALE
    }
    pub fn phi(&self) -> f64 {
        self.rd / SCALE
    }
    fn from_glicko2(mu: f64, phi: f64, volatility: f64) -> Self {
        Self {
            elo: (mu * SCALE + 1500.0) as Elo,
            rd: phi * SCALE,
            volatility,
        }
    }
}

/// Outcome score on the Glicko-2 scale: 1.0 win, 0.5 tie, 0.0 loss.
pub fn outcome_score(own_score: f64, opponent_score: f64) -> f64 {
    if own_score > opponent_score {
        1.0
    } else if own_score < opponent_score {
        0.0
    } else {
        0.5
    }
}

fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * phi * phi / (std::f64::consts::PI * std::f64::consts::PI)).sqrt()
}

fn expectation(mu: f64, opponent_mu: f64, opponent_phi: f64) -> f64 {
    1.0 / (1.0 + (-g(opponent_phi) * (mu - opponent_mu)).exp())
}

fn variance(mu: f64, opponent_mu: f64, opponent_phi: f64) -> f64 {
    let g_phi = g(opponent_phi);
    let e = expectation(mu, opponent_mu, opponent_phi);
    let denom = g_phi * g_phi * e * (1.0 - e);
    if denom > 0.0 {
        1.0 / denom
    } else {
        f64::INFINITY
    }
}

fn delta(mu: f64, v: f64, opponent_mu: f64, opponent_phi: f64, score: f64) -> f64 {
    let g_phi = g(opponent_phi);
    let e = expectation(mu, opponent_mu, opponent_phi);
    v * g_phi * (score - e)
}

/// Illinois regula-falsi solve for the new volatility `sigma'`.
fn new_volatility(sigma: f64, phi: f64, v: f64, delta: f64) -> f64 {
    let a = (sigma * sigma).ln();
    let phi_sq = phi * phi;
    let f = |x: f64| -> f64 {
        let exp_x = x.exp();
        let tmp = phi_sq + v + exp_x;
        (exp_x * (delta * delta - phi_sq - v - exp_x)) / (2.0 * tmp * tmp) - (x - a) / (TAU * TAU)
    };

    let mut big_a = a;
    let mut big_b = if delta * delta > phi_sq + v {
        (delta * delta - phi_sq - v).ln()
    } else {
        let mut k = 1.0;
        while f(a - k * TAU) < 0.0 {
            k += 1.0;
        }
        a - k * TAU
    };

    let mut f_a = f(big_a);
    let mut f_b = f(big_b);
    while (big_b - big_a).abs() > EPSILON {
        let c = big_a + (big_a - big_b) * f_a / (f_b - f_a);
        let f_c = f(c);
        if f_c * f_b <= 0.0 {
            big_a = big_b;
            f_a = f_b;
        } else {
            f_a /= 2.0;
        }
        big_b = c;
        f_b = f_c;
    }
    (big_a / 2.0).exp()
}

/// Runs one Glicko-2 update for a player against a single opponent.
pub fn update(rating: Rating, opponent_mu: f64, opponent_phi: f64, score: f64) -> Rating {
    let mu = rating.mu();
    let phi = rating.phi();
    let v = variance(mu, opponent_mu, opponent_phi);
    let d = delta(mu, v, opponent_mu, opponent_phi, score);
    let sigma_prime = new_volatility(rating.volatility, phi, v, d);
    let phi_star = (phi * phi + sigma_prime * sigma_prime).sqrt();
    let phi_prime = 1.0 / (1.0 / (phi_star * phi_star) + 1.0 / v).sqrt();
    let mu_prime = mu + phi_prime * phi_prime * g(opponent_phi) * (score - expectation(mu, opponent_mu, opponent_phi));
    Rating::from_glicko2(mu_prime, phi_prime, sigma_prime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_winner_gains_loser_loses() {
        let a = Rating::new(1500);
        let b = Rating::new(1500);
        let a_new = update(a, b.mu(), b.phi(), outcome_score(1.0, 0.0));
        let b_new = update(b, a.mu(), a.phi(), outcome_score(0.0, 1.0));
        assert!(a_new.elo > a.elo);
        assert!(b_new.elo < b.elo);
    }

    #[test]
    fn tie_between_equals_leaves_elo_roughly_unchanged() {
        let a = Rating::new(1500);
        let b = Rating::new(1500);
        let a_new = update(a, b.mu(), b.phi(), 0.5);
        assert!((a_new.elo - a.elo).abs() <= 1);
    }

    #[test]
    fn underdog_win_gains_more_than_favorite_win() {
        let underdog = Rating::new(1300);
        let favorite = Rating::new(1700);
        let underdog_new = update(underdog, favorite.mu(), favorite.phi(), 1.0);
        let favorite_new = update(favorite, underdog.mu(), underdog.phi(), 1.0);
        let underdog_gain = underdog_new.elo - underdog.elo;
        let favorite_gain = favorite_new.elo - favorite.elo;
        assert!(underdog_gain > favorite_gain);
    }

    #[test]
    fn outcome_score_reads_win_tie_loss() {
        assert_eq!(outcome_score(100.0, 50.0), 1.0);
        assert_eq!(outcome_score(50.0, 100.0), 0.0);
        assert_eq!(outcome_score(50.0, 50.0), 0.5);
    }
}
