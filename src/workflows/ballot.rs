//! Ballot deployment, voting and results.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};

use crate::orchestrator::encoding::bytes32_from_text;
use crate::orchestrator::{Arg, DeploymentPlan, OrchestratorError, Step};
use crate::workflows::{signed_by, Contracts};

/// Token, snapshot block, then a ballot over `proposals`.
///
/// The snapshot is taken after the token is confirmed so the ballot counts
/// voting power as of that block.
pub fn deploy_plan(contracts: &Contracts, proposals: &[String]) -> Result<DeploymentPlan, OrchestratorError> {
    if proposals.is_empty() {
        return Err(OrchestratorError::Configuration(
            "Proposals not provided".to_string(),
        ));
    }
    Ok(DeploymentPlan::new()
        .then(Step::deploy("token", &contracts.token, vec![]))
        .then(Step::capture_block("snapshot"))
        .then(ballot_step(contracts, proposals)?))
}

/// Proposal names are always UTF-8 text right-padded to `bytes32`, even
/// when they look like hex.
fn ballot_step(contracts: &Contracts, proposals: &[String]) -> Result<Step, OrchestratorError> {
    let names = proposals
        .iter()
        .map(|p| {
            bytes32_from_text(p)
                .map(|word| Arg::Value(DynSolValue::FixedBytes(word, 32)))
                .map_err(|e| OrchestratorError::Configuration(format!("invalid proposal name: {}", e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Step::deploy(
        "ballot",
        &contracts.ballot,
        vec![Arg::List(names), Arg::step("token"), Arg::step("snapshot")],
    ))
}

/// The whole voting lifecycle on a fresh deployment.
///
/// Every voter gets `amount` tokens and delegates to itself before the
/// snapshot. Voter `i` then spends half its power on proposal `i % n`.
pub fn demo_plan(
    contracts: &Contracts,
    proposals: &[String],
    voters: &[String],
    amount: U256,
) -> Result<DeploymentPlan, OrchestratorError> {
    if proposals.is_empty() {
        return Err(OrchestratorError::Configuration(
            "Proposals not provided".to_string(),
        ));
    }
    if voters.is_empty() {
        return Err(OrchestratorError::Configuration(
            "at least one voter is required".to_string(),
        ));
    }

    let mut plan = DeploymentPlan::new().then(Step::deploy("token", &contracts.token, vec![]));
    for voter in voters {
        plan.push(Step::write(
            &format!("mint_{}", voter),
            "token",
            "mint",
            vec![Arg::account(voter), uint(amount)],
        ));
    }
    for voter in voters {
        plan.push(
            Step::write(
                &format!("delegate_{}", voter),
                "token",
                "delegate",
                vec![Arg::account(voter)],
            )
            .from_account(voter),
        );
        plan.push(Step::read(
            &format!("power_{}", voter),
            "token",
            "getVotes",
            vec![Arg::account(voter)],
        ));
    }

    plan.push(Step::capture_block("snapshot"));
    plan.push(ballot_step(contracts, proposals)?);

    let share = amount / U256::from(2u8);
    for (i, voter) in voters.iter().enumerate() {
        let proposal = U256::from(i % proposals.len());
        plan.push(
            Step::write(
                &format!("vote_{}", voter),
                "ballot",
                "vote",
                vec![uint(proposal), uint(share)],
            )
            .from_account(voter),
        );
    }

    Ok(plan
        .then(Step::read("winningProposal", "ballot", "winningProposal", vec![]))
        .then(Step::read("winnerName", "ballot", "winnerName", vec![])))
}

/// Vote on an existing ballot and read the proposal back.
pub fn vote_plan(
    contracts: &Contracts,
    ballot: Address,
    proposal: u64,
    amount: &str,
    from: Option<&str>,
) -> DeploymentPlan {
    let vote = Step::write(
        "vote",
        "ballot",
        "vote",
        vec![uint(U256::from(proposal)), Arg::literal(amount)],
    );
    DeploymentPlan::new()
        .then(Step::attach("ballot", &contracts.ballot, ballot))
        .then(signed_by(vote, from))
        .then(Step::read(
            "proposal",
            "ballot",
            "proposals",
            vec![uint(U256::from(proposal))],
        ))
}

/// Winner plus the tally of the first `proposal_count` proposals.
pub fn results_plan(contracts: &Contracts, ballot: Address, proposal_count: u64) -> DeploymentPlan {
    let mut plan = DeploymentPlan::new()
        .then(Step::attach("ballot", &contracts.ballot, ballot))
        .then(Step::read("winningProposal", "ballot", "winningProposal", vec![]))
        .then(Step::read("winnerName", "ballot", "winnerName", vec![]));
    for i in 0..proposal_count {
        plan.push(Step::read(
            &format!("proposal_{}", i),
            "ballot",
            "proposals",
            vec![uint(U256::from(i))],
        ));
    }
    plan
}

fn uint(value: U256) -> Arg {
    Arg::Value(DynSolValue::Uint(value, 256))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::InvokeMode;

    fn names(plan: &DeploymentPlan) -> Vec<&str> {
        plan.steps().iter().map(Step::name).collect()
    }

    #[test]
    fn test_deploy_requires_proposals() {
        let err = deploy_plan(&Contracts::default(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "configuration error: Proposals not provided");
    }

    #[test]
    fn test_deploy_order() {
        let proposals = vec!["Cats".to_string(), "Dogs".to_string()];
        let plan = deploy_plan(&Contracts::default(), &proposals).unwrap();
        assert_eq!(names(&plan), ["token", "snapshot", "ballot"]);
        match &plan.steps()[2] {
            Step::Deploy { artifact, args, .. } => {
                assert_eq!(artifact, "TokenizedBallot");
                assert_eq!(args[1], Arg::step("token"));
                assert_eq!(args[2], Arg::step("snapshot"));
                assert!(matches!(&args[0], Arg::List(items) if items.len() == 2));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_proposal_names_are_text_even_when_hex_like() {
        let proposals = vec!["0xCAFE".to_string(), "0x".to_string() + &"ab".repeat(15)];
        let plan = deploy_plan(&Contracts::default(), &proposals).unwrap();
        match &plan.steps()[2].args()[0] {
            Arg::List(items) => {
                assert_eq!(
                    items[0],
                    Arg::Value(DynSolValue::FixedBytes(bytes32_from_text("0xCAFE").unwrap(), 32))
                );
                match &items[1] {
                    Arg::Value(DynSolValue::FixedBytes(word, 32)) => {
                        assert_eq!(&word[..32], proposals[1].as_bytes());
                    }
                    other => panic!("unexpected proposal {:?}", other),
                }
            }
            other => panic!("unexpected proposals {:?}", other),
        }
    }

    #[test]
    fn test_overlong_proposal_name_rejected() {
        let proposals = vec!["x".repeat(33)];
        let err = deploy_plan(&Contracts::default(), &proposals).unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
        assert!(err.to_string().contains("33 bytes"));

        let voters = vec!["alice".to_string()];
        let err = demo_plan(&Contracts::default(), &proposals, &voters, U256::from(10u64)).unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[test]
    fn test_demo_snapshot_after_delegation() {
        let proposals = vec!["A".to_string(), "B".to_string()];
        let voters = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
        let plan = demo_plan(&Contracts::default(), &proposals, &voters, U256::from(100u64)).unwrap();
        let order = names(&plan);

        let snapshot = order.iter().position(|n| *n == "snapshot").unwrap();
        let last_delegate = order.iter().rposition(|n| n.starts_with("delegate_")).unwrap();
        let first_vote = order.iter().position(|n| n.starts_with("vote_")).unwrap();
        assert!(last_delegate < snapshot);
        assert!(snapshot < first_vote);
        assert_eq!(order.last(), Some(&"winnerName"));

        match &plan.steps()[first_vote + 2] {
            Step::Invoke { args, from, mode, .. } => {
                assert_eq!(*mode, InvokeMode::Write);
                assert_eq!(from.as_deref(), Some("carol"));
                assert_eq!(args[0], uint(U256::ZERO));
                assert_eq!(args[1], uint(U256::from(50u64)));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_results_reads_every_proposal() {
        let plan = results_plan(&Contracts::default(), Address::repeat_byte(1), 3);
        assert_eq!(plan.len(), 6);
        assert!(plan.steps()[1..].iter().all(|s| s.kind() == "read"));
    }

    #[test]
    fn test_vote_sender() {
        let plan = vote_plan(&Contracts::default(), Address::repeat_byte(1), 1, "10", Some("voter"));
        assert_eq!(plan.steps()[1].sender(), Some("voter"));
    }
}
