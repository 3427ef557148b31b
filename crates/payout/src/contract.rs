use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// A token contract the dispatcher may deliver through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTarget {
    pub id: u32,
    pub name: String,
    pub address: Address,
}

impl ContractTarget {
    pub fn new(id: u32, name: impl Into<String>, address: Address) -> Self {
        Self {
            id,
            name: name.into(),
            address,
        }
    }

    /// Parse a priority-ordered `name=0xaddr,name=0xaddr` list.
    ///
    /// Entries without a name (`0xaddr`) are named after their position.
    /// Ids are assigned from 1 in list order.
    pub fn parse_list(spec: &str) -> Result<Vec<Self>, String> {
        let mut targets: Vec<Self> = Vec::new();
        for (index, entry) in spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
        {
            let id = index as u32 + 1;
            let (name, address) = match entry.split_once('=') {
                Some((name, address)) => (name.trim().to_string(), address.trim()),
                None => (format!("contract-{id}"), entry),
            };
            let address: Address = address
                .parse()
                .map_err(|e| format!("contract '{name}': invalid address '{address}': {e}"))?;
            if targets.iter().any(|t| t.address == address) {
                return Err(format!("contract '{name}': duplicate address {address}"));
            }
            targets.push(Self::new(id, name, address));
        }
        if targets.is_empty() {
            return Err("contract list is empty".to_string());
        }
        Ok(targets)
    }
}

impl std::fmt::Display for ContractTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Attempt order for one dispatch: the preferred contract (if configured)
/// first, then everything else in configured order. Never repeats a target.
pub fn attempt_order<'a>(
    contracts: &'a [ContractTarget],
    preferred: Option<Address>,
) -> Vec<&'a ContractTarget> {
    let mut order: Vec<&ContractTarget> = Vec::with_capacity(contracts.len());
    if let Some(first) = preferred.and_then(|p| contracts.iter().find(|c| c.address == p)) {
        order.push(first);
    }
    for contract in contracts {
        if !order.iter().any(|c| c.address == contract.address) {
            order.push(contract);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<ContractTarget> {
        vec![
            ContractTarget::new(1, "A", Address::repeat_byte(0xaa)),
            ContractTarget::new(2, "B", Address::repeat_byte(0xbb)),
            ContractTarget::new(3, "C", Address::repeat_byte(0xcc)),
        ]
    }

    fn names(order: &[&ContractTarget]) -> Vec<String> {
        order.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn no_preference_keeps_configured_order() {
        let contracts = abc();
        assert_eq!(names(&attempt_order(&contracts, None)), ["A", "B", "C"]);
    }

    #[test]
    fn preferred_moves_to_front() {
        let contracts = abc();
        let order = attempt_order(&contracts, Some(Address::repeat_byte(0xcc)));
        assert_eq!(names(&order), ["C", "A", "B"]);
    }

    #[test]
    fn unknown_preference_is_ignored() {
        let contracts = abc();
        let order = attempt_order(&contracts, Some(Address::repeat_byte(0x01)));
        assert_eq!(names(&order), ["A", "B", "C"]);
    }

    #[test]
    fn duplicate_configuration_is_attempted_once() {
        let mut contracts = abc();
        contracts.push(ContractTarget::new(4, "A-again", Address::repeat_byte(0xaa)));
        assert_eq!(names(&attempt_order(&contracts, None)), ["A", "B", "C"]);
    }

    #[test]
    fn parse_list_assigns_ids_and_names() {
        let list = ContractTarget::parse_list(
            "Reward=0xE1edB9510e468C745CCAD91238b83CF63BF7c7aD, 0x0000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, 1);
        assert_eq!(list[0].name, "Reward");
        assert_eq!(list[1].id, 2);
        assert_eq!(list[1].name, "contract-2");
    }

    #[test]
    fn parse_list_rejects_garbage() {
        assert!(ContractTarget::parse_list("").is_err());
        assert!(ContractTarget::parse_list("Bad=0x1234").is_err());
        assert!(ContractTarget::parse_list(
            "a=0x0000000000000000000000000000000000000001,b=0x0000000000000000000000000000000000000001"
        )
        .is_err());
    }
}
