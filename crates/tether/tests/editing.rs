mod common;

use common::{Customer, init_tracing, record_keys};
use tether::context::{EDITING_KEY, HAS_CHANGES_KEY};
use tether::prelude::*;

fn filled() -> Customer {
    let customer = Customer::default();
    customer.set_name("Ada".into());
    customer.set_email("ada@example.com".into());
    customer.set_age(36);
    customer
}

#[test]
fn change_map_holds_the_first_original() {
    init_tracing();
    let customer = filled();
    customer.begin_edit();
    customer.set_name("Bea".into());
    customer.set_name("Cy".into());

    assert_eq!(customer.ctx.changed_keys(), ["Name"]);
    assert_eq!(
        customer.ctx.original_value::<String>("Name").as_deref(),
        Some("Ada")
    );
    assert!(customer.ctx.has_changes());
}

#[test]
fn cancel_restores_and_notifies_once() {
    init_tracing();
    let customer = filled();
    customer.begin_edit();
    customer.set_name("Bea".into());
    customer.set_age(40);

    let (keys, _sub) = record_keys(&customer);
    customer.cancel_edit();

    assert_eq!(*customer.name.borrow(), "Ada");
    assert_eq!(*customer.age.borrow(), 36);
    assert!(!customer.ctx.is_editing());
    assert!(!customer.ctx.has_changes());
    let keys = keys.borrow();
    assert_eq!(keys.iter().filter(|k| *k == EDITING_KEY).count(), 1);
    assert_eq!(keys.iter().filter(|k| *k == HAS_CHANGES_KEY).count(), 1);
    assert_eq!(keys.last().map(String::as_str), Some(EDITING_KEY));
}

#[test]
fn end_edit_commits() {
    init_tracing();
    let customer = filled();
    customer.begin_edit();
    customer.set_email("bea@example.com".into());
    customer.end_edit();

    assert!(!customer.ctx.is_editing());
    assert!(customer.ctx.changed_keys().is_empty());
    assert_eq!(*customer.email.borrow(), "bea@example.com");
}

#[test]
fn fresh_validation_reports_each_failing_key_after_the_sweep() {
    init_tracing();
    let customer = Customer::default();
    let (keys, _sub) = record_keys(&customer);
    let during = std::rc::Rc::new(std::cell::Cell::new(0));
    let d = std::rc::Rc::clone(&during);
    let _errors = customer.ctx.validator().errors_changed().subscribe(move |_| {
        d.set(d.get() + 1);
    });

    assert!(customer.validate());
    assert!(customer.ctx.has_errors());
    assert!(during.get() > 0);
    assert_eq!(*keys.borrow(), ["Name", "Email", "Age"]);
    assert!(!customer.ctx.is_validating());
}

#[test]
fn valid_model_validates_quietly() {
    init_tracing();
    let customer = filled();
    let (keys, _sub) = record_keys(&customer);
    assert!(!customer.validate());
    assert!(keys.borrow().is_empty());
}

#[test]
fn validation_inside_a_transaction_captures_nothing() {
    init_tracing();
    let customer = Customer::default();
    customer.begin_edit();
    customer.validate();
    assert!(!customer.ctx.has_changes());
    assert!(customer.ctx.is_editing());
}

#[test]
fn two_way_binding_feeds_the_transaction() {
    init_tracing();
    let customer = std::rc::Rc::new(filled());
    let field = Observable::new(String::new());
    let binding = PropertyBinding::new(Property::notifying(&customer, "Name").unwrap())
        .to(Property::from_observable(&field, "Text"));
    binding.bind().unwrap();
    binding.update_target();

    customer.begin_edit();
    field.set("Bea".into());
    assert_eq!(customer.ctx.changed_keys(), ["Name"]);

    customer.cancel_edit();
    assert_eq!(field.get(), "Ada");
}
