use chrono::Utc;
use uuid::Uuid;

use crate::actor_framework::Entity;
use crate::domain::{
    display_name, payment_link, split_amounts, GroupOrder, GroupOrderCreate, Payment, SubOrder, MAX_DIVISIONS,
    MIN_DIVISIONS,
};
use super::actions::{GroupOrderAction, GroupOrderActionResult};

impl Entity for GroupOrder {
    type Id = String;
    type CreateParams = GroupOrderCreate;
    type Patch = ();
    type Action = GroupOrderAction;
    type ActionResult = GroupOrderActionResult;
    type Filter = ();

    fn id(&self) -> &String {
        &self.id
    }

    /// Splits the order total into `divisions` shares.
    ///
    /// # Notes
    /// Every share but the last is the total divided evenly and cut to cents;
    /// the last one absorbs the remainder.
    fn from_create_params(id: String, params: GroupOrderCreate) -> Result<Self, String> {
        if !(MIN_DIVISIONS..=MAX_DIVISIONS).contains(&params.divisions) {
            return Err(format!("divisions must be between {} and {}", MIN_DIVISIONS, MAX_DIVISIONS));
        }
        let shares = split_amounts(params.total, params.divisions)
            .into_iter()
            .enumerate()
            .map(|(index, amount)| {
                let person_id = Uuid::new_v4().to_string();
                SubOrder {
                    display_name: display_name(&params.names, index),
                    payment_link: payment_link(&params.order_id, &person_id),
                    person_id,
                    amount,
                    paid: false,
                    payment: None,
                }
            })
            .collect();
        let now = Utc::now();

        Ok(Self {
            id,
            order_id: params.order_id,
            total: params.total,
            divisions: params.divisions,
            shares,
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// One group per order.
    fn unique_key(&self) -> Option<String> {
        Some(format!("order:{}", self.order_id))
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Err("group orders change only through share payments".to_string())
    }

    fn handle_action(&mut self, action: GroupOrderAction) -> Result<GroupOrderActionResult, String> {
        match action {
            GroupOrderAction::MarkSharePaid { person_id, method } => {
                let Some(share) = self.shares.iter_mut().find(|s| s.person_id == person_id) else {
                    return Ok(GroupOrderActionResult::UnknownShare(person_id));
                };
                if share.paid {
                    return Ok(GroupOrderActionResult::SharePaid {
                        group: self.clone(),
                        completed_now: false,
                    });
                }

                share.paid = true;
                share.payment = Some(Payment::paid_now(method, share.amount));
                self.updated_at = Utc::now();

                let completed_now = !self.completed && self.all_paid();
                if completed_now {
                    self.completed = true;
                }
                Ok(GroupOrderActionResult::SharePaid {
                    group: self.clone(),
                    completed_now,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn group(divisions: u32) -> Result<GroupOrder, String> {
        GroupOrder::from_create_params(
            "group_1".into(),
            GroupOrderCreate {
                order_id: "order_1".into(),
                total: Decimal::new(10000, 2),
                divisions,
                names: vec!["Ana".into()],
            },
        )
    }

    fn pay(group: &mut GroupOrder, person_id: &str) -> GroupOrderActionResult {
        group
            .handle_action(GroupOrderAction::MarkSharePaid {
                person_id: person_id.to_string(),
                method: "card".into(),
            })
            .unwrap()
    }

    #[test]
    fn test_shares_and_links() {
        let group = group(3).unwrap();
        assert_eq!(group.shares.len(), 3);
        assert_eq!(group.shares[0].display_name, "Ana");
        assert_eq!(group.shares[2].display_name, "Person 3");
        assert_eq!(group.shares[2].amount, Decimal::new(3334, 2));
        let share = &group.shares[1];
        assert_eq!(share.payment_link, format!("/pay/order_1/{}", share.person_id));
        assert_eq!(group.unique_key(), Some("order:order_1".to_string()));
    }

    #[test]
    fn test_divisions_out_of_range() {
        assert!(group(1).is_err());
        assert!(group(11).is_err());
        assert!(group(10).is_ok());
    }

    #[test]
    fn test_completion_fires_once() {
        let mut group = group(2).unwrap();
        let first = group.shares[0].person_id.clone();
        let second = group.shares[1].person_id.clone();

        assert!(matches!(pay(&mut group, &first), GroupOrderActionResult::SharePaid { completed_now: false, .. }));
        assert!(matches!(pay(&mut group, &first), GroupOrderActionResult::SharePaid { completed_now: false, .. }));
        assert!(matches!(pay(&mut group, &second), GroupOrderActionResult::SharePaid { completed_now: true, .. }));
        assert!(matches!(pay(&mut group, &second), GroupOrderActionResult::SharePaid { completed_now: false, .. }));
        assert!(group.completed);
    }

    #[test]
    fn test_unknown_share() {
        let mut group = group(2).unwrap();
        assert!(matches!(pay(&mut group, "nobody"), GroupOrderActionResult::UnknownShare(p) if p == "nobody"));
    }
}
