//! Test cases for the LoopbackInterface.

use rstest::*;

use scpirs::{LoopbackInterface, ScpiInterface};

/// A function that creates a new `LoopbackInterface` from string slices with `"\r\n"` terminator.
fn crt_lbk(input: Vec<&str>, output: Vec<&str>) -> LoopbackInterface {
    let h2i = input.iter().map(|s| s.to_string()).collect();
    let i2h = output.iter().map(|s| s.to_string()).collect();
    LoopbackInterface::new(h2i, i2h, "\r\n")
}

/// Create a loopback interface that contains no commands.
#[fixture]
fn emp_lbk() -> LoopbackInterface {
    crt_lbk(vec![], vec![])
}

/// Ensure `finalize` method passes if an empty loopback interface is used.
#[rstest]
fn finalize_test(mut emp_lbk: LoopbackInterface) {
    emp_lbk.finalize();
}

/// Ensure dropping the interface panics if commands are left in the loopback interface.
#[rstest]
#[case(vec!["cmd"], vec![])]
#[case(vec![], vec!["resp"])]
#[case(vec!["cmd"], vec!["resp"])]
#[should_panic]
fn finalize_test_panic(#[case] from_host: Vec<&str>, #[case] from_inst: Vec<&str>) {
    let _ = crt_lbk(from_host, from_inst);
}

#[rstest]
fn sendcmd() {
    let mut lbk = crt_lbk(vec!["ACQ:RST", "ACQ:START"], vec![]);
    lbk.sendcmd("ACQ:RST").unwrap();
    lbk.sendcmd("ACQ:START").unwrap();
}

#[rstest]
#[should_panic]
fn sendcmd_mismatch() {
    let mut lbk = crt_lbk(vec!["ACQ:START"], vec![]);
    let _ = lbk.sendcmd("ACQ:STOP");
}

#[rstest]
fn terminator(mut emp_lbk: LoopbackInterface) {
    emp_lbk.test_terminator("\r\n");
    emp_lbk.set_terminator("\n");
    emp_lbk.test_terminator("\n");
}

#[rstest]
#[should_panic]
fn terminator_wrong(emp_lbk: LoopbackInterface) {
    emp_lbk.test_terminator("\n");
}

#[rstest]
fn query() {
    let mut lbk = crt_lbk(
        vec!["ACQ:TRig:STAT?", "ACQ:TRig:FILL?"],
        vec!["WAIT", "1"],
    );
    assert_eq!(lbk.query("ACQ:TRig:STAT?").unwrap(), "WAIT");
    assert_eq!(lbk.query("ACQ:TRig:FILL?").unwrap(), "1");
}

#[rstest]
fn query_block() {
    let mut lbk = LoopbackInterface::with_raw_responses(
        vec!["ACQ:SOUR1:DATA:OLD:N? 2".to_string()],
        vec![b"#14\x00\x01\xff\xff\r\n".to_vec()],
        "\r\n",
    );
    assert_eq!(
        lbk.query_block("ACQ:SOUR1:DATA:OLD:N? 2").unwrap(),
        vec![0x00, 0x01, 0xff, 0xff]
    );
}
