mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{Customer, init_tracing};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use tether::prelude::*;

/// A clickable control with an enabled flag.
struct Button {
    clicked: Notifier<()>,
    enabled: Rc<Cell<bool>>,
}

impl Button {
    fn new() -> Self {
        Self {
            clicked: Notifier::new(),
            enabled: Rc::new(Cell::new(true)),
        }
    }

    fn source<P>(&self) -> EventHandlerSource<(), P> {
        let enabled = Rc::clone(&self.enabled);
        EventHandlerSource::new(&self.clicked).with_set_enabled(move |on| enabled.set(on))
    }
}

#[test]
fn save_button_follows_model_validity() {
    init_tracing();
    let customer = Rc::new(Customer::default());
    let saved = Rc::new(Cell::new(0));

    let c = Rc::clone(&customer);
    let s = Rc::clone(&saved);
    let save = Rc::new(
        DelegateCommand::<()>::new(move |_| s.set(s.get() + 1))
            .with_can_execute(move |_| !c.has_errors()),
    );
    let button = Button::new();
    let binding = CommandBinding::new(Rc::clone(&save)).to(button.source());
    binding.bind().unwrap();
    binding.update_target();
    assert!(!button.enabled.get());

    customer.set_name("Ada".into());
    customer.set_email("ada@example.com".into());
    customer.set_age(36);
    save.raise_can_execute_changed();
    assert!(button.enabled.get());

    button.clicked.emit(&());
    assert_eq!(saved.get(), 1);
}

#[test]
fn explicit_parameter_reaches_the_command() {
    init_tracing();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let button = Button::new();
    let binding = CommandBinding::new(DelegateCommand::new(move |p: Option<&&str>| {
        s.borrow_mut().push(p.copied());
    }))
    .to(button.source())
    .with_parameter("delete");
    binding.bind().unwrap();

    button.clicked.emit(&());
    assert_eq!(*seen.borrow(), [Some("delete")]);
}

#[test]
fn one_command_many_triggers() {
    init_tracing();
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    let (menu, toolbar) = (Button::new(), Button::new());
    let sources = EventListSource::<(), ()>::new();
    sources.listen(&menu.clicked);
    sources.listen(&toolbar.clicked);

    let binding = CommandBinding::new(DelegateCommand::new(move |_| c.set(c.get() + 1))).to(sources);
    binding.bind().unwrap();

    menu.clicked.emit(&());
    toolbar.clicked.emit(&());
    assert_eq!(count.get(), 2);
}

#[test]
fn async_load_can_be_cancelled_from_a_second_button() {
    init_tracing();
    let mut pool = LocalPool::new();
    let loaded = Rc::new(Cell::new(false));
    let l = Rc::clone(&loaded);
    let (tx, rx) = oneshot::channel::<()>();
    let gate = Rc::new(RefCell::new(Some(rx)));
    let load = AsyncCommand::new(pool.spawner(), move |_: Option<()>, token: CancellationToken| {
        let rx = gate.borrow_mut().take();
        let l = Rc::clone(&l);
        async move {
            if let Some(rx) = rx {
                until_released(token, rx).await?;
            }
            l.set(true);
            anyhow::Ok(())
        }
    });

    let (load_button, cancel_button) = (Button::new(), Button::new());
    let load_binding = CommandBinding::new(load.clone()).to(load_button.source());
    let cancel_binding = CommandBinding::new(load.cancel_command()).to(cancel_button.source());
    load_binding.bind().unwrap();
    cancel_binding.bind().unwrap();
    cancel_binding.update_target();
    assert!(!cancel_button.enabled.get());

    load_button.clicked.emit(&());
    pool.run_until_stalled();
    assert!(load.is_running());
    assert!(!load_button.enabled.get());
    assert!(cancel_button.enabled.get());

    cancel_button.clicked.emit(&());
    pool.run_until_stalled();
    assert!(!load.is_running());
    assert!(!loaded.get());
    assert!(load.error().is_none());
    assert!(load_button.enabled.get());
    assert!(!cancel_button.enabled.get());
    drop(tx);
}

/// Wait for `rx` unless `token` fires first.
async fn until_released(token: CancellationToken, rx: oneshot::Receiver<()>) -> anyhow::Result<()> {
    use futures::future::{Either, select};

    let cancelled = std::pin::pin!(token.cancelled());
    match select(cancelled, rx).await {
        Either::Left(_) => anyhow::bail!("cancelled"),
        Either::Right(_) => Ok(()),
    }
}

#[test]
fn async_failure_is_exposed_as_a_property() {
    init_tracing();
    let mut pool = LocalPool::new();
    let cmd = AsyncCommand::new(pool.spawner(), |_: Option<()>, _| async {
        Err::<(), _>(anyhow::anyhow!("offline"))
    });
    let error = cmd.error_property();
    let status = Observable::new(String::new());
    let binding = PropertyBinding::new(error.map(|e| e.map(|e| e.to_string()).unwrap_or_default()))
        .to(Property::from_observable(&status, "Status"))
        .one_way();
    binding.bind().unwrap();

    cmd.execute(None);
    pool.run_until_stalled();
    assert_eq!(status.get(), "offline");
}
