#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use tether::prelude::*;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Record every property-changed key raised by `owner`.
pub fn record_keys(owner: &impl NotifyPropertyChanged) -> (Rc<RefCell<Vec<String>>>, Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let sub = owner
        .property_changed()
        .subscribe(move |e| s.borrow_mut().push(e.key().to_owned()));
    (seen, sub)
}

/// A customer form view model with guarded setters.
#[derive(Default)]
pub struct Customer {
    pub ctx: DataContext,
    pub name: RefCell<String>,
    pub email: RefCell<String>,
    pub age: RefCell<u32>,
}

impl Customer {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set_name(&self, value: String) {
        let _ = self
            .ctx
            .validator()
            .check_property("Name", &value)
            .not_empty()
            .min_length(2);
        self.update_property(&self.name, value, "Name");
    }

    pub fn set_email(&self, value: String) {
        let _ = self
            .ctx
            .validator()
            .check_property("Email", &value)
            .satisfies(|v| v.contains('@'), "Email must contain '@'");
        self.update_property(&self.email, value, "Email");
    }

    pub fn set_age(&self, value: u32) {
        let _ = self
            .ctx
            .validator()
            .check_property("Age", &value)
            .satisfies(|v| *v >= 18, "Age must be at least 18");
        self.update_property(&self.age, value, "Age");
    }
}

impl KeyValueCoding for Customer {
    fn accessors() -> &'static AccessorTable<Self> {
        static TABLE: LazyLock<AccessorTable<Customer>> = LazyLock::new(|| {
            AccessorTable::new()
                .read_write("Name", |c: &Customer| c.name.borrow().clone(), Customer::set_name)
                .read_write("Email", |c: &Customer| c.email.borrow().clone(), Customer::set_email)
                .read_write("Age", |c: &Customer| *c.age.borrow(), Customer::set_age)
                .read_only("Display", |c: &Customer| {
                    format!("{} <{}>", c.name.borrow(), c.email.borrow())
                })
        });
        &TABLE
    }

    fn error_info(&self) -> Option<&dyn DataErrorInfo> {
        Some(&self.ctx)
    }
}

impl NotifyPropertyChanged for Customer {
    fn property_changed(&self) -> &Notifier<PropertyChanged> {
        self.ctx.property_changed()
    }
}

impl Editable for Customer {
    fn data_context(&self) -> &DataContext {
        &self.ctx
    }
}
