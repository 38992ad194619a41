//! The loopback module provides an instrument simulator for testing purposes.
//!
//! The [`LoopbackInterface`] allows to test instrument drivers that communicate using SCPI
//! strings with a fixed terminator, as well as drivers that receive binary blocks.

use std::collections::VecDeque;

use crate::{ScpiError, ScpiInterface};

/// A self-incrementing index structure that by default starts at 0 and increments whenever `next`
/// is called.
#[derive(Debug, Default)]
struct IncrIndex {
    index: usize,
}

impl IncrIndex {
    fn next(&mut self) -> usize {
        let current = self.index;
        self.index += 1;
        current
    }
}

/// An interface that allows you to simply write tests for your instrument driver.
///
/// # Example
///
/// Let us build a simple instrument that sends a `"*IDN?"` query and write a test for it. The
/// instrument itself takes any interface that implements the [`ScpiInterface`] trait.
///
/// ```
/// use scpirs::{LoopbackInterface, ScpiError, ScpiInterface};
///
/// struct MyInstrument<T: ScpiInterface> {
///     interface: T,
/// }
///
/// impl<T: ScpiInterface> MyInstrument<T> {
///     fn get_name(&mut self) -> Result<String, ScpiError> {
///         self.interface.query("*IDN?")
///     }
/// }
///
/// let host2inst = vec!["*IDN?".to_string()];
/// let inst2host = vec!["REDPITAYA,INSTR2020,0,01-02".to_string()];
///
/// // Create the loopback interface with the expected commands and the default terminator.
/// let loopback = LoopbackInterface::new(host2inst, inst2host, "\r\n");
///
/// let mut inst = MyInstrument { interface: loopback };
/// assert_eq!("REDPITAYA,INSTR2020,0,01-02", inst.get_name().unwrap());
///
/// // Loopback interface is dropped here and checks that all commands were used.
/// ```
#[derive(Debug)]
pub struct LoopbackInterface {
    from_host: Vec<String>,
    from_inst: Vec<Vec<u8>>,
    terminator_exp: String,
    from_host_index: IncrIndex,
    from_inst_index: IncrIndex,
    curr_bytes: VecDeque<u8>,
    terminator: String,
}

impl LoopbackInterface {
    /// Create a new loopback instrument with given commands to and from instrument.
    ///
    /// You provide a list of commands that are expected to go from the host to the instrument,
    /// and a list of responses that go from the instrument to the host. Both are consumed in
    /// order and `terminator_exp` is appended to each of them. Whenever something is sent that
    /// is not expected, the interface panics. When the [`LoopbackInterface`] is dropped,
    /// [`LoopbackInterface::finalize`] checks that everything you provided has been used.
    ///
    /// # Arguments:
    /// * `from_host` - Commands from host to instrument.
    /// * `from_inst` - Responses from instrument to host.
    /// * `terminator_exp` - The expected terminator.
    pub fn new(from_host: Vec<String>, from_inst: Vec<String>, terminator_exp: &str) -> Self {
        let from_inst = from_inst
            .into_iter()
            .map(|resp| format!("{resp}{terminator_exp}").into_bytes())
            .collect();
        Self::with_raw_responses(from_host, from_inst, terminator_exp)
    }

    /// Create a new loopback instrument where responses are given as raw bytes.
    ///
    /// The responses are handed to the host verbatim, no terminator is appended. Use this to
    /// test drivers that read binary blocks.
    ///
    /// # Arguments:
    /// * `from_host` - Commands from host to instrument.
    /// * `from_inst` - Raw responses from instrument to host.
    /// * `terminator_exp` - The expected terminator of the commands from the host.
    pub fn with_raw_responses(
        from_host: Vec<String>,
        from_inst: Vec<Vec<u8>>,
        terminator_exp: &str,
    ) -> Self {
        LoopbackInterface {
            from_host,
            from_inst,
            terminator_exp: terminator_exp.to_string(),
            from_host_index: IncrIndex::default(),
            from_inst_index: IncrIndex::default(),
            curr_bytes: VecDeque::new(),
            terminator: "\r\n".to_string(),
        }
    }

    /// This command panics if not all commands in the [`LoopbackInterface`] have been used.
    ///
    /// It is automatically called when the [`LoopbackInterface`] is dropped, but you can also
    /// call it manually.
    pub fn finalize(&mut self) {
        let from_host_leftover = self.from_host.get(self.from_host_index.next());
        let from_inst_leftover = self.from_inst.get(self.from_inst_index.next());
        if let Some(fil) = from_host_leftover {
            panic!("Leftover expected commands found from host to instrument: {fil}");
        }
        if let Some(fil) = from_inst_leftover {
            panic!(
                "Leftover expected responses found from instrument to host: {:?}",
                String::from_utf8_lossy(fil)
            );
        }
    }

    /// Test the interface's terminator and ensure the right one is set.
    pub fn test_terminator(&self, expected_terminator: &str) {
        assert_eq!(
            expected_terminator, self.terminator,
            "Expected terminator '{expected_terminator:?}', got '{:?}'",
            self.terminator
        );
    }

    /// Get the next command from host to instrument including the expected terminator, or panic.
    fn get_next_from_host_with_terminator(&mut self) -> String {
        let cmd = self
            .from_host
            .get(self.from_host_index.next())
            .expect("No more commands were expected from host to instrument.");
        format!("{cmd}{}", self.terminator_exp)
    }

    /// Function to read exactly one byte from the next response of the instrument.
    ///
    /// This just panics if there are no more responses. If there are no more responses but one
    /// is required, the panic is justified as this is a test interface.
    fn read_one_byte(&mut self) -> u8 {
        match self.curr_bytes.pop_front() {
            Some(byte) => byte,
            None => {
                let next = self
                    .from_inst
                    .get(self.from_inst_index.next())
                    .expect("No more responses were expected from instrument to host.");
                self.curr_bytes = next.iter().copied().collect();
                self.read_one_byte()
            }
        }
    }
}

impl ScpiInterface for LoopbackInterface {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ScpiError> {
        for byte in buf.iter_mut() {
            *byte = self.read_one_byte();
        }
        Ok(())
    }

    fn write_raw(&mut self, cmd: &[u8]) -> Result<(), ScpiError> {
        let exp = self.get_next_from_host_with_terminator();
        assert_eq!(
            exp.as_bytes(),
            cmd,
            "Expected sendcmd '{0:?}', got '{1:?}'",
            exp,
            String::from_utf8_lossy(cmd)
        );
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }
}

impl Drop for LoopbackInterface {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.finalize();
        }
    }
}
