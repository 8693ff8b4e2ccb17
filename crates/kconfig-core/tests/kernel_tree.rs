//! End-to-end tests over the kernel-style fixture tree in `tests/fixtures`.

use {
    kconfig_core::{Model, SymbolValue, Tristate},
    std::{env, path::PathBuf},
};

fn fixture_root() -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("tests/fixtures/Kconfig")
}

fn load_fixture() -> Model {
    Model::load(fixture_root()).unwrap()
}

fn write_config(model: &Model) -> String {
    let mut out = Vec::new();
    model.write_config(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

const ALLDEFCONFIG: &str = "\
#
# Automatically generated file; DO NOT EDIT.
# Test Kernel Configuration
#
CONFIG_MODULES=y

#
# General setup
#
CONFIG_SWAP=y
CONFIG_LOG_BUF_SHIFT=17
CONFIG_LOCALVERSION=\"-test\"
# CONFIG_EXPERT is not set

#
# Device Drivers
#
# CONFIG_PCI is not set
# CONFIG_FW_LOADER is not set
CONFIG_CC_OPTIMIZE_FOR_PERFORMANCE=y
# CONFIG_CC_OPTIMIZE_FOR_SIZE is not set
";

#[test_log::test]
fn alldefconfig_output_matches_reference() {
    let model = load_fixture();
    assert_eq!(write_config(&model), ALLDEFCONFIG);
}

#[test]
fn loading_is_deterministic() {
    let first = load_fixture();
    let second = load_fixture();

    assert_eq!(write_config(&first), write_config(&second));
    assert_eq!(first.all_symbols().count(), second.all_symbols().count());
}

#[test]
fn write_round_trips_through_load() {
    let mut model = load_fixture();

    let first = write_config(&model);
    model.load_config(first.as_bytes(), true).unwrap();
    let second = write_config(&model);

    assert_eq!(first, second);
}

#[test]
fn round_trip_canonicalizes_order() {
    let mut model = load_fixture();

    // Assignments out of tree order, with modern spacing quirks.
    let input = "CONFIG_LOG_BUF_SHIFT=20\nCONFIG_PCI=y\nCONFIG_SWAP=y\n";
    model.load_config(input.as_bytes(), true).unwrap();

    let out = write_config(&model);
    let pci = out.find("CONFIG_PCI=y").unwrap();
    let log_buf = out.find("CONFIG_LOG_BUF_SHIFT=20").unwrap();

    // Tree order puts LOG_BUF_SHIFT (General setup) before PCI (Device Drivers).
    assert!(log_buf < pci);
}

#[test]
fn enabling_pci_reveals_dependent_entries() {
    let mut model = load_fixture();

    let pci = model.symbol("PCI").unwrap();
    assert!(model.set_value(pci, Tristate::Yes));

    let out = write_config(&model);
    assert!(out.contains("CONFIG_PCI_MSI=y"));
    assert!(out.contains("\n#\n# Bus-dependent drivers\n#\n"));
    assert!(out.contains("# CONFIG_USB is not set"));
}

#[test]
fn select_propagates_through_the_tree() {
    let mut model = load_fixture();

    for name in ["PCI", "USB", "USB_STORAGE"] {
        let sym = model.symbol(name).unwrap();
        let value = if name == "PCI" { Tristate::Yes } else { Tristate::Mod };
        assert!(model.set_value(sym, value), "failed to set {name}");
    }

    let scsi = model.symbol("SCSI").unwrap();
    assert_eq!(model.value(scsi).tristate(), Some(Tristate::Mod));
    assert!(write_config(&model).contains("CONFIG_SCSI=m"));

    // SCSI has no prompt; its value is owed entirely to the reverse dependency.
    assert_eq!(model.visibility(scsi), Tristate::No);
}

#[test]
fn imply_from_config_file() {
    let mut model = load_fixture();

    model.load_config(&b"CONFIG_FW_LOADER=y\n"[..], true).unwrap();
    let fw_cache = model.symbol("FW_CACHE").unwrap();
    assert_eq!(model.value(fw_cache).tristate(), Some(Tristate::Yes));
    assert!(write_config(&model).contains("CONFIG_FW_CACHE=y"));

    // An explicit n in the same file overrides the imply.
    model.load_config(&b"CONFIG_FW_LOADER=y\n# CONFIG_FW_CACHE is not set\n"[..], true).unwrap();
    assert_eq!(model.value(fw_cache).tristate(), Some(Tristate::No));
}

#[test]
fn choice_election_from_config_file() {
    let mut model = load_fixture();

    model.load_config(&b"CONFIG_CC_OPTIMIZE_FOR_SIZE=y\n"[..], true).unwrap();

    let size = model.symbol("CC_OPTIMIZE_FOR_SIZE").unwrap();
    let performance = model.symbol("CC_OPTIMIZE_FOR_PERFORMANCE").unwrap();

    assert_eq!(model.value(size).tristate(), Some(Tristate::Yes));
    assert_eq!(model.value(performance).tristate(), Some(Tristate::No));

    let choice = model.sym(size).choice().unwrap();
    assert_eq!(model.choice_selection(choice), Some(size));

    let elected: Vec<_> = model
        .choice(choice)
        .members()
        .iter()
        .filter(|m| model.value(**m).tristate() == Some(Tristate::Yes))
        .collect();
    assert_eq!(elected.len(), 1);
}

#[test]
fn out_of_range_values_clamp_on_load() {
    let mut model = load_fixture();

    model.load_config(&b"CONFIG_LOG_BUF_SHIFT=30\n"[..], true).unwrap();
    let log_buf = model.symbol("LOG_BUF_SHIFT").unwrap();
    assert_eq!(model.value(log_buf), SymbolValue::Int(25));

    model.load_config(&b"CONFIG_LOG_BUF_SHIFT=3\n"[..], true).unwrap();
    assert_eq!(model.value(log_buf), SymbolValue::Int(12));
}

#[test]
fn unknown_symbols_warn_but_do_not_fail() {
    let mut model = load_fixture();

    model.load_config(&b"CONFIG_NOT_A_REAL_OPTION=y\nCONFIG_SWAP=y\n"[..], true).unwrap();

    assert!(model.warnings().iter().any(|w| w.message.contains("NOT_A_REAL_OPTION")));

    let swap = model.symbol("SWAP").unwrap();
    assert_eq!(model.value(swap).tristate(), Some(Tristate::Yes));
}

#[test]
fn values_stay_within_assignable() {
    let mut model = load_fixture();

    let pci = model.symbol("PCI").unwrap();
    let usb = model.symbol("USB").unwrap();
    assert!(model.set_value(pci, Tristate::Yes));
    assert!(model.set_value(usb, Tristate::Mod));

    for sym in model.all_symbols().collect::<Vec<_>>() {
        let assignable = model.assignable(sym);
        if assignable.is_empty() {
            continue;
        }

        let value = model.value(sym).tristate().unwrap();
        assert!(
            assignable.contains(&value),
            "{}: value {value} not in {assignable:?}",
            model.sym(sym).name()
        );
    }
}

#[test]
fn allnoconfig_turns_everything_off() {
    let mut model = load_fixture();
    model.allnoconfig();

    let swap = model.symbol("SWAP").unwrap();
    assert_eq!(model.value(swap).tristate(), Some(Tristate::No));

    let modules = model.symbol("MODULES").unwrap();
    assert_eq!(model.value(modules).tristate(), Some(Tristate::No));
}

#[test]
fn autoconf_matches_config_state() {
    let mut model = load_fixture();

    let pci = model.symbol("PCI").unwrap();
    assert!(model.set_value(pci, Tristate::Yes));

    let mut out = Vec::new();
    model.write_autoconf(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("#define CONFIG_PCI 1\n"));
    assert!(text.contains("#define CONFIG_LOG_BUF_SHIFT 17\n"));
    assert!(text.contains("#define CONFIG_LOCALVERSION \"-test\"\n"));
    assert!(!text.contains("CONFIG_EXPERT"));
}

#[test]
fn eval_expression_over_the_tree() {
    let mut model = load_fixture();

    assert_eq!(model.eval_expression("SWAP && MODULES").unwrap(), Tristate::Yes);
    assert_eq!(model.eval_expression("PCI || USB").unwrap(), Tristate::No);
    assert_eq!(model.eval_expression("LOG_BUF_SHIFT >= 12").unwrap(), Tristate::Yes);

    let pci = model.symbol("PCI").unwrap();
    assert!(model.set_value(pci, Tristate::Yes));
    assert_eq!(model.eval_expression("PCI || USB").unwrap(), Tristate::Yes);
}

#[test]
fn item_tree_walk_visits_menus_in_order() {
    let model = load_fixture();

    let mut menus = Vec::new();
    for (_, item) in model.iter_items() {
        if let kconfig_core::ItemPayload::Menu {
            prompt, ..
        } = item.payload()
        {
            menus.push(prompt.clone());
        }
    }

    assert_eq!(menus, ["General setup", "Device Drivers"]);
}
