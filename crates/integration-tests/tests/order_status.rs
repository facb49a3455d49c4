//! The order status graph shared by checkout and the admin API.

use emporium_core::OrderStatus;

#[test]
fn test_happy_path_is_allowed() {
    let path = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];
    for pair in path.windows(2) {
        if let [from, to] = pair {
            assert!(from.can_transition_to(*to), "{from} -> {to}");
        }
    }
}

#[test]
fn test_no_going_back() {
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
    assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Shipped));
    assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Pending));
}

#[test]
fn test_terminal_statuses_are_final() {
    for from in OrderStatus::ALL.iter().filter(|s| s.is_terminal()) {
        for to in OrderStatus::ALL {
            assert!(!from.can_transition_to(*to), "{from} -> {to}");
        }
    }
}

#[test]
fn test_shipped_orders_cannot_be_cancelled() {
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
}

#[test]
fn test_revenue_statuses() {
    let paid: Vec<_> = OrderStatus::ALL.iter().filter(|s| s.is_paid()).collect();
    assert_eq!(
        paid,
        [
            &OrderStatus::Paid,
            &OrderStatus::Processing,
            &OrderStatus::Shipped,
            &OrderStatus::Delivered,
        ]
    );
}

#[test]
fn test_no_self_transitions() {
    for status in OrderStatus::ALL {
        assert!(!status.can_transition_to(*status));
    }
}
