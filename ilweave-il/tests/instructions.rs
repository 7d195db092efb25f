use ilweave_il::*;

// --- mnemonics ---

#[test]
fn mnemonic_round_trip() {
    for op in [
        Opcode::Nop,
        Opcode::Ldarg,
        Opcode::Ldloc,
        Opcode::Stloc,
        Opcode::LdcI4,
        Opcode::LdcR8,
        Opcode::Ldfld,
        Opcode::Ldflda,
        Opcode::Ldsfld,
        Opcode::Stfld,
        Opcode::Dup,
        Opcode::Pop,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Neg,
        Opcode::Call,
        Opcode::Callvirt,
        Opcode::CallOverride,
        Opcode::Ret,
    ] {
        assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
    }
}

#[test]
fn unknown_mnemonic_rejected() {
    assert_eq!(Opcode::from_mnemonic("br"), None);
    assert_eq!(Opcode::from_mnemonic("ldarg.0"), None);
}

// --- flags ---

#[test]
fn call_flags() {
    assert!(Opcode::Call.is_call());
    assert!(Opcode::Callvirt.is_call());
    assert!(Opcode::CallOverride.is_call());
    assert!(!Opcode::Ldarg.is_call());
}

#[test]
fn return_flags() {
    assert!(Opcode::Ret.is_return());
    assert!(!Opcode::Call.is_return());
}

#[test]
fn only_override_calls_are_injected() {
    assert!(Opcode::CallOverride.is_injected());
    for op in [Opcode::Call, Opcode::Callvirt, Opcode::Ret, Opcode::Nop] {
        assert!(!op.is_injected());
    }
}

// --- shape helpers ---

#[test]
fn is_call_to_matches_both_dispatch_kinds() {
    assert!(Instruction::call("Player", "get_X").is_call_to("Player", "get_X"));
    assert!(Instruction::callvirt("Player", "get_X").is_call_to("Player", "get_X"));
    assert!(!Instruction::call("Player", "get_Y").is_call_to("Player", "get_X"));
    assert!(!Instruction::ldfld("Player", "get_X").is_call_to("Player", "get_X"));
}

#[test]
fn touches_field_covers_all_field_opcodes() {
    assert!(Instruction::ldfld("Vector2", "Y").touches_field("Vector2", "Y"));
    assert!(Instruction::ldflda("Player", "Speed").touches_field("Player", "Speed"));
    assert!(Instruction::ldsfld("Input", "Grab").touches_field("Input", "Grab"));
    assert!(Instruction::stfld("Player", "Speed").touches_field("Player", "Speed"));
    assert!(!Instruction::call("Player", "Speed").touches_field("Player", "Speed"));
}

#[test]
fn const_and_arg_helpers() {
    assert!(Instruction::ldc_i4(0).loads_const_i4(0));
    assert!(!Instruction::ldc_i4(1).loads_const_i4(0));
    assert!(Instruction::ldarg(0).loads_arg(0));
    assert!(!Instruction::ldarg(1).loads_arg(0));
}

#[test]
fn override_ref_carries_shape_and_arity() {
    let insn = Instruction::call_override("mod_ducking", Shape::Transform, 1);
    let ovr = insn.override_ref().unwrap();
    assert_eq!(ovr.name, "mod_ducking");
    assert_eq!(ovr.shape, Shape::Transform);
    assert_eq!(ovr.arity, 1);
    assert!(Instruction::ret().override_ref().is_none());
}

// --- display ---

#[test]
fn instruction_display() {
    assert_eq!(Instruction::ldarg(0).to_string(), "ldarg 0");
    assert_eq!(
        Instruction::callvirt("Player", "set_Ducking").to_string(),
        "callvirt Player::set_Ducking"
    );
    assert_eq!(
        Instruction::call_override("o", Shape::Observe, 2).to_string(),
        "callx o:observe:2"
    );
    assert_eq!(Instruction::ldc_r8(-1.0).to_string(), "ldc.r8 -1.0");
}
