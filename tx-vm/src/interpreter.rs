//! Bytecode interpreter.
//!
//! The execute loop fetches the current frame, dispatches one instruction,
//! then advances or faults, driven by the decoded `Instruction` stream of
//! `crate::opcode` rather than raw bytes, and gassed through
//! `crate::gas::GasMeter` on every step.

use crate::context::{ContextBody, ExecutionContext};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::gas::GasMeter;
use crate::host::{Host, LoadedContext};
use crate::opcode::Instruction;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tx_core::{Address, Value};

/// Terminal/intermediate execution states.
#[derive(Debug, Clone, PartialEq)]
pub enum VMState {
    Running,
    Halt,
    Fault(Error),
}

pub struct Interpreter {
    frames: Vec<Frame>,
    pub gas: GasMeter,
    state: VMState,
}

impl Interpreter {
    pub fn new(entry_address: Address, entry_context: ExecutionContext, gas: GasMeter) -> Self {
        let frame = Frame::new(entry_address, entry_context, 0);
        Self {
            frames: vec![frame],
            gas,
            state: VMState::Running,
        }
    }

    pub fn state(&self) -> &VMState {
        &self.state
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_entry_address(&self) -> Option<&Address> {
        self.frames.last().map(|f| &f.entry_address)
    }

    /// Pushes a value onto the entry frame's operand stack before `run` is
    /// first called — used to seed trigger/call arguments.
    pub fn push_argument(&mut self, value: Value) -> Result<()> {
        let idx = self.frames.len() - 1;
        self.frames[idx].stack.push(value)
    }

    /// The final top-of-stack value once `state() == Halt`, or an empty
    /// `Bytes` value if the frame ended with an empty stack.
    pub fn result(&self) -> Value {
        self.frames
            .last()
            .and_then(|f| f.stack.peek())
            .cloned()
            .unwrap_or(Value::Bytes(Vec::new()))
    }

    /// Runs until Halt or Fault. Returns the terminal state; the same value
    /// is also retrievable from `state()` afterwards.
    pub fn run(&mut self, host: &mut dyn Host) -> VMState {
        loop {
            match self.step(host) {
                Ok(true) => continue,
                Ok(false) => {
                    self.state = VMState::Halt;
                    break;
                }
                Err(fault) => {
                    self.state = VMState::Fault(fault);
                    break;
                }
            }
        }
        self.state.clone()
    }

    /// Executes one instruction. `Ok(true)` means keep running, `Ok(false)`
    /// means the outermost frame returned (Halt).
    fn step(&mut self, host: &mut dyn Host) -> Result<bool> {
        let frame_index = match self.frames.len() {
            0 => return Ok(false),
            n => n - 1,
        };

        let instruction = {
            let frame = &self.frames[frame_index];
            match &frame.context.body {
                ContextBody::Native => {
                    // A native context was pushed as a frame only if CTX's
                    // Native branch below is reached recursively, which it
                    // never is — native contexts are handled without a
                    // frame push. Defensive fault if that invariant breaks.
                    return Err(Error::Fault("native context in frame stack".into()));
                }
                ContextBody::Script(script) => match script.get(frame.pc) {
                    Some(instr) => instr.clone(),
                    None => Instruction::Ret,
                },
            }
        };

        self.gas.validate_opcode(instruction.gas_cost())?;

        self.dispatch(frame_index, instruction, host)
    }

    fn dispatch(&mut self, idx: usize, instruction: Instruction, host: &mut dyn Host) -> Result<bool> {
        match instruction {
            Instruction::Nop => self.advance(idx),
            Instruction::Push(v) => {
                self.frames[idx].stack.push(v)?;
                self.advance(idx)
            }
            Instruction::Pop => {
                self.frames[idx].stack.pop()?;
                self.advance(idx)
            }
            Instruction::Dup => {
                let top = self.frames[idx].stack.peek().cloned().ok_or(Error::StackUnderflow)?;
                self.frames[idx].stack.push(top)?;
                self.advance(idx)
            }
            Instruction::Swap => {
                let a = self.frames[idx].stack.pop()?;
                let b = self.frames[idx].stack.pop()?;
                self.frames[idx].stack.push(a)?;
                self.frames[idx].stack.push(b)?;
                self.advance(idx)
            }
            Instruction::Add => self.binary_int(idx, |a, b| a + b),
            Instruction::Sub => self.binary_int(idx, |a, b| a - b),
            Instruction::Mul => self.binary_int(idx, |a, b| a * b),
            Instruction::Div => self.binary_int_checked(idx, |a, b| a / b),
            Instruction::Mod => self.binary_int_checked(idx, |a, b| a % b),
            Instruction::Neg => {
                let v = self.frames[idx].stack.pop()?;
                let n = v.as_int()?.clone();
                self.frames[idx].stack.push(Value::Int(-n))?;
                self.advance(idx)
            }
            Instruction::And => self.binary_bool(idx, |a, b| a && b),
            Instruction::Or => self.binary_bool(idx, |a, b| a || b),
            Instruction::Xor => self.binary_bool(idx, |a, b| a ^ b),
            Instruction::Not => {
                let v = self.frames[idx].stack.pop()?;
                let b = v.as_bool()?;
                self.frames[idx].stack.push(Value::Bool(!b))?;
                self.advance(idx)
            }
            Instruction::Eq => {
                let b = self.frames[idx].stack.pop()?;
                let a = self.frames[idx].stack.pop()?;
                self.frames[idx].stack.push(Value::Bool(a == b))?;
                self.advance(idx)
            }
            Instruction::Lt => self.comparison(idx, |ord| ord == std::cmp::Ordering::Less),
            Instruction::Gt => self.comparison(idx, |ord| ord == std::cmp::Ordering::Greater),
            Instruction::Lte => self.comparison(idx, |ord| ord != std::cmp::Ordering::Greater),
            Instruction::Gte => self.comparison(idx, |ord| ord != std::cmp::Ordering::Less),
            Instruction::Load(key) => {
                let value = self.frames[idx]
                    .locals
                    .get(&key)
                    .cloned()
                    .unwrap_or(Value::Bytes(Vec::new()));
                self.frames[idx].stack.push(value)?;
                self.advance(idx)
            }
            Instruction::Get(key) => {
                let value = self.frames[idx]
                    .locals
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| Error::Fault(format!("no local named {key:?}")))?;
                self.frames[idx].stack.push(value)?;
                self.advance(idx)
            }
            Instruction::Put(key) => {
                let value = self.frames[idx].stack.pop()?;
                self.frames[idx].locals.insert(key, value);
                self.advance(idx)
            }
            Instruction::Jmp(target) => self.jump(idx, target),
            Instruction::JmpIf(target) => {
                let cond = self.frames[idx].stack.pop()?.as_bool()?;
                if cond {
                    self.jump(idx, target)
                } else {
                    self.advance(idx)
                }
            }
            Instruction::JmpIfNot(target) => {
                let cond = self.frames[idx].stack.pop()?.as_bool()?;
                if !cond {
                    self.jump(idx, target)
                } else {
                    self.advance(idx)
                }
            }
            Instruction::Switch(table) => {
                let index = self.frames[idx].stack.pop()?.as_int()?.clone();
                let i = index.to_i64().ok_or(Error::SwitchOutOfRange(i64::MAX))?;
                let target = *table
                    .get(i as usize)
                    .ok_or(Error::SwitchOutOfRange(i))?;
                self.jump(idx, target)
            }
            Instruction::Throw(msg) => Err(Error::AssertionFailed(msg)),
            Instruction::Call(target) => self.call(idx, target),
            Instruction::Ret => self.ret(idx),
            Instruction::Ctx(name) => self.ctx_switch(idx, name, host),
            Instruction::ExtCall(name) => {
                let context_name = self.frames[idx].context.name.clone();
                let entry_address = self.frames[idx].entry_address;
                host.call_extern(
                    &name,
                    &mut self.frames[idx].stack,
                    &mut self.gas,
                    &context_name,
                    &entry_address,
                )?;
                self.advance(idx)
            }
        }
    }

    fn advance(&mut self, idx: usize) -> Result<bool> {
        self.frames[idx].pc += 1;
        Ok(true)
    }

    fn jump(&mut self, idx: usize, target: i32) -> Result<bool> {
        if target < 0 {
            return Err(Error::InvalidJumpTarget(target as i64));
        }
        self.frames[idx].pc = target as usize;
        Ok(true)
    }

    fn binary_int(&mut self, idx: usize, f: impl Fn(BigInt, BigInt) -> BigInt) -> Result<bool> {
        let b = self.frames[idx].stack.pop()?;
        let a = self.frames[idx].stack.pop()?;
        let result = f(a.as_int()?.clone(), b.as_int()?.clone());
        self.frames[idx].stack.push(Value::Int(result))?;
        self.advance(idx)
    }

    fn binary_int_checked(&mut self, idx: usize, f: impl Fn(BigInt, BigInt) -> BigInt) -> Result<bool> {
        let b = self.frames[idx].stack.pop()?;
        let a = self.frames[idx].stack.pop()?;
        let bv = b.as_int()?.clone();
        if bv == BigInt::from(0) {
            return Err(Error::Fault("division by zero".into()));
        }
        let result = f(a.as_int()?.clone(), bv);
        self.frames[idx].stack.push(Value::Int(result))?;
        self.advance(idx)
    }

    fn binary_bool(&mut self, idx: usize, f: impl Fn(bool, bool) -> bool) -> Result<bool> {
        let b = self.frames[idx].stack.pop()?;
        let a = self.frames[idx].stack.pop()?;
        let result = f(a.as_bool()?, b.as_bool()?);
        self.frames[idx].stack.push(Value::Bool(result))?;
        self.advance(idx)
    }

    fn comparison(&mut self, idx: usize, f: impl Fn(std::cmp::Ordering) -> bool) -> Result<bool> {
        let b = self.frames[idx].stack.pop()?;
        let a = self.frames[idx].stack.pop()?;
        let ord = a.compare(&b)?;
        self.frames[idx].stack.push(Value::Bool(f(ord)))?;
        self.advance(idx)
    }

    /// Local subroutine call within the same context: the callee frame
    /// shares the caller's stack contents, and on RET, the caller's stack is
    /// overwritten by whatever the callee ends up with.
    fn call(&mut self, idx: usize, target: u32) -> Result<bool> {
        let caller = &self.frames[idx];
        let mut callee = Frame::new(
            caller.entry_address,
            caller.context.clone(),
            caller.pc as u32 + 1,
        );
        callee.stack = caller.stack.clone();
        callee.pc = target as usize;
        self.frames.push(callee);
        Ok(true)
    }

    fn ret(&mut self, _idx: usize) -> Result<bool> {
        if self.frames.len() == 1 {
            // The outermost frame is returning: leave it in place so
            // `result()` can still read its final stack top after Halt.
            return Ok(false);
        }
        let finished = self.frames.pop().ok_or(Error::FrameUnderflow)?;
        let caller = self.frames.last_mut().ok_or(Error::FrameUnderflow)?;
        caller.stack = finished.stack;
        caller.pc = finished.return_offset as usize;
        Ok(true)
    }

    /// `CTX <name>`: resolves the named context through the host and either
    /// pushes a new frame (script contexts) or performs a single synchronous
    /// native call (native contexts).
    fn ctx_switch(&mut self, idx: usize, name: String, host: &mut dyn Host) -> Result<bool> {
        match host.load_context(&name)? {
            LoadedContext::Script(context) => {
                let caller = &self.frames[idx];
                let new_entry = Address::from_contract_name(&context.name);
                let mut callee = Frame::new(new_entry, context, caller.pc as u32 + 1);
                callee.stack = caller.stack.clone();
                self.frames.push(callee);
                Ok(true)
            }
            LoadedContext::Native(contract_name) => {
                let entry_address = self.frames[idx].entry_address;
                host.invoke_native(
                    &contract_name,
                    &mut self.frames[idx].stack,
                    &mut self.gas,
                    &entry_address,
                )?;
                self.advance(idx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Script;
    use crate::stack::OperandStack;

    struct NullHost;
    impl Host for NullHost {
        fn load_context(&mut self, name: &str) -> Result<LoadedContext> {
            Err(Error::UnresolvedContext(name.to_string()))
        }
        fn invoke_native(
            &mut self,
            contract: &str,
            _stack: &mut OperandStack,
            _gas: &mut GasMeter,
            _entry_address: &Address,
        ) -> Result<()> {
            Err(Error::MissingHandler(contract.to_string()))
        }
        fn call_extern(
            &mut self,
            name: &str,
            _stack: &mut OperandStack,
            _gas: &mut GasMeter,
            _context_name: &str,
            _entry_address: &Address,
        ) -> Result<()> {
            Err(Error::MissingHandler(name.to_string()))
        }
    }

    fn int(n: i64) -> Value {
        Value::Int(BigInt::from(n))
    }

    #[test]
    fn halts_and_returns_top_of_stack() {
        let script = Script::new(vec![
            Instruction::Push(int(2)),
            Instruction::Push(int(3)),
            Instruction::Add,
            Instruction::Ret,
        ]);
        let ctx = ExecutionContext::script("entry", script);
        let gas = GasMeter::new(1_000, 0, true, false);
        let mut vm = Interpreter::new(Address::null(), ctx, gas);
        let state = vm.run(&mut NullHost);
        assert_eq!(state, VMState::Halt);
        assert_eq!(vm.result(), int(5));
    }

    #[test]
    fn unknown_stack_underflow_faults() {
        let script = Script::new(vec![Instruction::Add]);
        let ctx = ExecutionContext::script("entry", script);
        let gas = GasMeter::new(1_000, 0, true, false);
        let mut vm = Interpreter::new(Address::null(), ctx, gas);
        let state = vm.run(&mut NullHost);
        assert_eq!(state, VMState::Fault(Error::StackUnderflow));
    }

    #[test]
    fn gas_exhaustion_faults() {
        let script = Script::new(vec![
            Instruction::Push(int(1)),
            Instruction::Push(int(1)),
            Instruction::Add,
            Instruction::Ret,
        ]);
        let ctx = ExecutionContext::script("entry", script);
        let gas = GasMeter::new(1, 0, true, false);
        let mut vm = Interpreter::new(Address::null(), ctx, gas);
        let state = vm.run(&mut NullHost);
        assert!(matches!(state, VMState::Fault(Error::GasExhausted { .. })));
    }

    #[test]
    fn call_and_return_share_stack() {
        // offsets: 0 PUSH 10, 1 CALL->3, 2 RET, 3 PUSH 5, 4 ADD, 5 RET
        let script = Script::new(vec![
            Instruction::Push(int(10)),
            Instruction::Call(3),
            Instruction::Ret,
            Instruction::Push(int(5)),
            Instruction::Add,
            Instruction::Ret,
        ]);
        let ctx = ExecutionContext::script("entry", script);
        let gas = GasMeter::new(10_000, 0, true, false);
        let mut vm = Interpreter::new(Address::null(), ctx, gas);
        let state = vm.run(&mut NullHost);
        assert_eq!(state, VMState::Halt);
        assert_eq!(vm.result(), int(15));
    }
}
