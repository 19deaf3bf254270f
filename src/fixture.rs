//! Fixtures for tests

use crate::facility::Facility;
use crate::inventory::InventoryNode;
use crate::production::ProductionFunction;
use crate::quantity::q;
use crate::resource_type::ResourceType;
use crate::units::Money;
use chrono::NaiveDate;
use log::{Level, LevelFilter, Log, Metadata, Record};
use rstest::fixture;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Assert that two quantities have the same dimension and approximately the same magnitude
macro_rules! assert_quantity_approx_eq {
    ($left:expr, $right:expr) => {{
        let left: &$crate::quantity::Quantity = &$left;
        let right: &$crate::quantity::Quantity = &$right;
        assert!(
            float_cmp::ApproxEq::approx_eq(left, right, float_cmp::F64Margin::default()),
            "{left} is not approximately equal to {right}"
        );
    }};
}
pub(crate) use assert_quantity_approx_eq;

thread_local! {
    /// Log records emitted on the current thread while capturing
    static CAPTURED_LOGS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// A logger which records messages for the thread that emitted them
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED_LOGS.with_borrow_mut(|logs| {
            logs.push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

/// Run `f` and return the log messages it emitted on this thread
pub fn capture_logs<F: FnOnce()>(f: F) -> Vec<(Level, String)> {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&CAPTURE_LOGGER).expect("Another logger is already installed");
        log::set_max_level(LevelFilter::Trace);
    });

    CAPTURED_LOGS.with_borrow_mut(Vec::clear);
    f();
    CAPTURED_LOGS.take()
}

#[fixture]
pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

#[fixture]
pub fn solar_panel() -> Rc<ResourceType> {
    Rc::new(ResourceType::new(
        "solar_panel",
        Vec::new(),
        ProductionFunction::Constant(vec![q("1000 kW")]),
    ))
}

/// Delivers half of the power it receives
#[fixture]
pub fn converter() -> Rc<ResourceType> {
    Rc::new(ResourceType::new(
        "converter",
        vec![q("1000 kW")],
        ProductionFunction::Proportional {
            reference: vec![q("1000 kW")],
            output: vec![q("500 kW")],
        },
    ))
}

/// A saltwater pump which only runs with its full power supply
#[fixture]
pub fn pump_type() -> Rc<ResourceType> {
    Rc::new(ResourceType::new(
        "saltwater_pump",
        vec![q("0.2025 kW")],
        ProductionFunction::Gated {
            minimum: vec![q("0.2025 kW")],
            inner: Box::new(ProductionFunction::Constant(vec![
                q("1000 psi"),
                q("0.702 m^3/h"),
            ])),
        },
    ))
}

/// A desalination membrane, needing power, pressure and feed water
#[fixture]
pub fn membrane_type() -> Rc<ResourceType> {
    Rc::new(ResourceType::new(
        "desalination_membrane",
        vec![q("45 psi"), q("9.75 m^3/h"), q("1132.23 kW")],
        ProductionFunction::Gated {
            minimum: vec![q("1132.23 kW"), q("45 psi")],
            inner: Box::new(ProductionFunction::Passthrough {
                limit: q("9.75 m^3/h"),
            }),
        },
    ))
}

/// A desalination plant.
///
/// The membrane is fed by two solar panels and a pump. The pump is fed by a converter, which is
/// fed by the first solar panel.
#[fixture]
pub fn desalination_facility(
    solar_panel: Rc<ResourceType>,
    converter: Rc<ResourceType>,
    pump_type: Rc<ResourceType>,
    membrane_type: Rc<ResourceType>,
    date: NaiveDate,
) -> Facility {
    let node = |resource_type: &Rc<ResourceType>, name: &str, price: f64, inputs| {
        Rc::new(
            InventoryNode::new(Rc::clone(resource_type), Money(price), date, inputs)
                .with_name(name),
        )
    };

    let solar_panel_1 = node(&solar_panel, "solar_panel_1", 1000.0, Vec::new());
    let solar_panel_2 = node(&solar_panel, "solar_panel_2", 1000.0, Vec::new());
    let converter_1 = node(
        &converter,
        "converter_1",
        15000.0,
        vec![Rc::clone(&solar_panel_1)],
    );
    let pump_1 = node(&pump_type, "saltwater_pump_1", 1500.0, vec![converter_1]);
    let membrane_1 = node(
        &membrane_type,
        "desalination_membrane_1",
        1_843_792.0,
        vec![solar_panel_1, solar_panel_2, pump_1],
    );

    Facility::new("desalination_plant", date, vec![membrane_1])
}
