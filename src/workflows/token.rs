//! Token operations against an existing deployment.
//!
//! Every plan ends with a read so the report shows the state after the
//! write confirmed.

use alloy::primitives::Address;

use crate::orchestrator::{Arg, DeploymentPlan, Step};
use crate::workflows::{signed_by, Contracts};

pub fn mint_plan(contracts: &Contracts, token: Address, to: Address, amount: &str) -> DeploymentPlan {
    let recipient = Arg::literal(to.to_string());
    DeploymentPlan::new()
        .then(Step::attach("token", &contracts.token, token))
        .then(Step::write(
            "mint",
            "token",
            "mint",
            vec![recipient.clone(), Arg::literal(amount)],
        ))
        .then(Step::read("balance", "token", "balanceOf", vec![recipient]))
}

pub fn transfer_plan(
    contracts: &Contracts,
    token: Address,
    to: Address,
    amount: &str,
    from: Option<&str>,
) -> DeploymentPlan {
    let recipient = Arg::literal(to.to_string());
    let transfer = Step::write(
        "transfer",
        "token",
        "transfer",
        vec![recipient.clone(), Arg::literal(amount)],
    );
    DeploymentPlan::new()
        .then(Step::attach("token", &contracts.token, token))
        .then(signed_by(transfer, from))
        .then(Step::read("balance", "token", "balanceOf", vec![recipient]))
}

/// Delegate `signer`'s voting power; to itself when `to` is `None`.
pub fn delegate_plan(contracts: &Contracts, token: Address, to: Option<Address>, signer: &str) -> DeploymentPlan {
    let delegatee = match to {
        Some(address) => Arg::literal(address.to_string()),
        None => Arg::account(signer),
    };
    let delegate = Step::write("delegate", "token", "delegate", vec![delegatee.clone()]);
    DeploymentPlan::new()
        .then(Step::attach("token", &contracts.token, token))
        .then(delegate.from_account(signer))
        .then(Step::read("votes", "token", "getVotes", vec![delegatee]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_reads_balance_after_write() {
        let to = Address::repeat_byte(3);
        let plan = mint_plan(&Contracts::default(), Address::repeat_byte(1), to, "1000");
        let kinds: Vec<_> = plan.steps().iter().map(Step::kind).collect();
        assert_eq!(kinds, ["attach", "write", "read"]);
        assert_eq!(plan.steps()[2].args()[0], Arg::literal(to.to_string()));
    }

    #[test]
    fn test_transfer_sender() {
        let plan = transfer_plan(
            &Contracts::default(),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            "5",
            Some("alice"),
        );
        assert_eq!(plan.steps()[1].sender(), Some("alice"));
    }

    #[test]
    fn test_self_delegation_defaults_to_signer() {
        let plan = delegate_plan(&Contracts::default(), Address::repeat_byte(1), None, "bob");
        assert_eq!(plan.steps()[1].args()[0], Arg::account("bob"));
        assert_eq!(plan.steps()[1].sender(), Some("bob"));

        let other = Address::repeat_byte(9);
        let plan = delegate_plan(&Contracts::default(), Address::repeat_byte(1), Some(other), "bob");
        assert_eq!(plan.steps()[2].args()[0], Arg::literal(other.to_string()));
    }
}
