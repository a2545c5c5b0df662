// ABOUTME: In-place byte arithmetic over segmented buffers, and conditional evaluation
// ABOUTME: Add-with-carry treats consecutive offsets as a little-endian number

use crate::buffer::{offset, resolve_id, AdvancedOffset, RESERVED_ID};
use crate::error::Error;
use crate::Result;

use super::commands::*;
use super::StreamProcessor;

enum Operand {
    None,
    Inline(u8),
    Buffer(u16, AdvancedOffset),
}

impl StreamProcessor {
    /// Execute the adjust command against `target_id`.
    ///
    /// The command byte packs the operation and the offset/operand/multiplicity
    /// flags; see the semantics matrix in the conditional and multi flags.
    pub(crate) fn buffer_adjust(&mut self, target_id: u16) -> Result<()> {
        let command = self.read_byte()?;

        let advanced = command & ADJUST_ADVANCED_OFFSETS != 0;
        let from_buffer = command & ADJUST_BUFFER_VALUE != 0;
        let multi_target = command & ADJUST_MULTI_TARGET != 0;
        let multi_operand = command & ADJUST_MULTI_OPERAND != 0;
        let op = command & ADJUST_OP_MASK;
        // Operations above NEG take an operand.
        let has_operand = op > ADJUST_NEG;

        let mut target_offset = self.read_offset(advanced)?;
        let mut count = 1usize;
        if multi_target || multi_operand {
            count = if advanced {
                self.read_24()? as usize
            } else {
                self.read_word()? as usize
            };
        }

        let mut operand_buffer = None;
        let mut operand_offset = AdvancedOffset::start();
        if from_buffer && has_operand {
            let raw = self.read_word()?;
            operand_offset = self.read_offset(advanced)?;
            let operand_id =
                resolve_id(raw, self.id).ok_or(Error::ReservedId(RESERVED_ID))?;
            match self.ctx.store.lock().blocks_cloned(operand_id) {
                Some(blocks) => operand_buffer = Some(blocks),
                None => return Err(Error::BufferNotFound(operand_id)),
            }
        }

        // A fixed operand is read up front; multi-operand values are pulled
        // per iteration below.
        let mut fixed_operand = 0u8;
        if has_operand && !multi_operand {
            fixed_operand = match &operand_buffer {
                Some(blocks) => {
                    let mut at = operand_offset;
                    match offset::buffer_byte(blocks, &mut at, false) {
                        Some(value) => value,
                        None => {
                            log::debug!("buffer_adjust: invalid operand offset");
                            return Ok(());
                        }
                    }
                }
                None => self.read_byte()?,
            };
        }

        let target = resolve_id(target_id, self.id).ok_or(Error::ReservedId(RESERVED_ID))?;
        let Some(blocks) = self.ctx.store.lock().blocks_cloned(target) else {
            return Err(Error::BufferNotFound(target));
        };

        let mut source = 0u8;
        if !multi_target {
            match offset::buffer_byte(&blocks, &mut target_offset, false) {
                Some(value) => source = value,
                None => {
                    log::debug!("buffer_adjust: invalid target offset");
                    return Ok(());
                }
            }
        }

        let mut carry = 0u8;
        let mut using_carry = false;

        for i in 0..count {
            if multi_target {
                match offset::buffer_byte(&blocks, &mut target_offset, false) {
                    Some(value) => source = value,
                    None => {
                        log::debug!("buffer_adjust: target offset ran off the buffer");
                        return Ok(());
                    }
                }
            }
            let operand = if has_operand && multi_operand {
                match &operand_buffer {
                    Some(op_blocks) => {
                        match offset::buffer_byte(op_blocks, &mut operand_offset, true) {
                            Some(value) => value,
                            None => {
                                log::debug!("buffer_adjust: operand ran off the buffer");
                                return Ok(());
                            }
                        }
                    }
                    None => self.read_byte()?,
                }
            } else if op == ADJUST_ADD_CARRY && multi_target && i > 0 {
                // A single operand over a run of targets is a little-endian
                // number zero-extended across the run; only the first byte
                // sees it, the rest add the carry alone.
                0
            } else {
                fixed_operand
            };

            match op {
                ADJUST_NOT => source = !source,
                ADJUST_NEG => source = source.wrapping_neg(),
                ADJUST_SET => source = operand,
                ADJUST_ADD => source = source.wrapping_add(operand),
                ADJUST_ADD_CARRY => {
                    using_carry = true;
                    let sum = source as u16 + operand as u16 + carry as u16;
                    source = sum as u8;
                    carry = (sum >> 8) as u8;
                }
                ADJUST_AND => source &= operand,
                ADJUST_OR => source |= operand,
                ADJUST_XOR => source ^= operand,
                _ => {
                    log::debug!("buffer_adjust: unknown operation {op}");
                    return Ok(());
                }
            }

            if multi_target && !offset::set_buffer_byte(&blocks, source, &mut target_offset, true) {
                log::debug!("buffer_adjust: failed to store at {target_offset:?}");
                return Ok(());
            }
        }

        if !multi_target {
            // Single target stores once, advancing so a carry byte lands at
            // the next position.
            if !offset::set_buffer_byte(&blocks, source, &mut target_offset, true) {
                log::debug!("buffer_adjust: failed to store at {target_offset:?}");
                return Ok(());
            }
        }
        if using_carry && !offset::set_buffer_byte(&blocks, carry, &mut target_offset, false) {
            log::debug!("buffer_adjust: no room for carry at {target_offset:?}");
        }
        Ok(())
    }

    /// Read and evaluate a conditional argument list.
    ///
    /// The whole argument list is consumed before evaluation so a missing
    /// buffer cannot desynchronise the stream; anything unreadable makes the
    /// conditional false.
    pub(crate) fn read_conditional(&mut self) -> Result<bool> {
        let command = self.read_byte()?;
        let check_id_raw = self.read_word()?;

        let advanced = command & COND_ADVANCED_OFFSETS != 0;
        let from_buffer = command & COND_BUFFER_VALUE != 0;
        let op = command & COND_OP_MASK;
        let has_operand = op > COND_NOT_EXISTS;

        let mut check_offset = self.read_offset(advanced)?;
        let operand_source = if has_operand {
            if from_buffer {
                let raw = self.read_word()?;
                let at = self.read_offset(advanced)?;
                Operand::Buffer(raw, at)
            } else {
                Operand::Inline(self.read_byte()?)
            }
        } else {
            Operand::None
        };

        let source = resolve_id(check_id_raw, self.id)
            .and_then(|id| self.ctx.store.lock().blocks_cloned(id))
            .and_then(|blocks| offset::buffer_byte(&blocks, &mut check_offset, false));
        let Some(source) = source else {
            log::debug!("conditional: check byte unreadable, evaluating false");
            return Ok(false);
        };

        let operand = match operand_source {
            Operand::None => 0,
            Operand::Inline(value) => value,
            Operand::Buffer(raw, mut at) => {
                let value = resolve_id(raw, self.id)
                    .and_then(|id| self.ctx.store.lock().blocks_cloned(id))
                    .and_then(|blocks| offset::buffer_byte(&blocks, &mut at, false));
                match value {
                    Some(value) => value,
                    None => {
                        log::debug!("conditional: operand unreadable, evaluating false");
                        return Ok(false);
                    }
                }
            }
        };

        let result = match op {
            COND_EXISTS => source != 0,
            COND_NOT_EXISTS => source == 0,
            COND_EQUAL => source == operand,
            COND_NOT_EQUAL => source != operand,
            COND_LESS => source < operand,
            COND_GREATER => source > operand,
            COND_LESS_EQUAL => source <= operand,
            COND_GREATER_EQUAL => source >= operand,
            COND_AND => source != 0 && operand != 0,
            COND_OR => source != 0 || operand != 0,
            other => {
                log::debug!("conditional: unknown operation {other}");
                false
            }
        };
        log::debug!("conditional: evaluated {result}");
        Ok(result)
    }
}
