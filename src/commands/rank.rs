use crate::rank::RankTier;

/// `rank`: print the badge for a balance.
pub fn show_rank(balance: f64) {
    match RankTier::for_balance(balance) {
        Some(tier) => println!("{} {}", tier.emoji(), tier.label()),
        None => println!("No rank yet"),
    }
}
