// ABOUTME: The buffered command set: store, execute and restructure byte streams
// ABOUTME: Call nests a processor, jump swaps the input stream, tail calls promote

use crate::buffer::{resolve_id, AdvancedOffset, RESERVED_ID};
use crate::stream::{ByteSource, MultiBlockStream};
use crate::Result;

use super::commands::*;
use super::StreamProcessor;

impl StreamProcessor {
    /// Dispatch one buffered command: `bufferId; command, args...`.
    pub(crate) fn vdu_buffered(&mut self) -> Result<()> {
        let buffer_id = self.read_word()?;
        let command = self.read_byte()?;

        match command {
            BUF_WRITE => {
                let length = self.read_word()? as usize;
                self.buffer_write(buffer_id, length)?;
            }
            BUF_CALL => self.buffer_call(buffer_id, AdvancedOffset::start()),
            BUF_CLEAR => self.ctx.store.lock().clear(buffer_id),
            BUF_CREATE => {
                let size = self.read_word()? as usize;
                self.ctx.store.lock().create(buffer_id, size);
            }
            BUF_SET_OUTPUT => self.set_output(buffer_id),
            BUF_ADJUST => self.buffer_adjust(buffer_id)?,
            BUF_COND_CALL => {
                if self.read_conditional()? {
                    self.buffer_call(buffer_id, AdvancedOffset::start());
                }
            }
            BUF_JUMP => {
                // An offset-less jump to the reserved id means "jump to end".
                let offset = self.jump_entry(buffer_id);
                self.buffer_jump(buffer_id, offset);
            }
            BUF_COND_JUMP => {
                let offset = self.jump_entry(buffer_id);
                if self.read_conditional()? {
                    self.buffer_jump(buffer_id, offset);
                }
            }
            BUF_OFFSET_JUMP => {
                let offset = self.read_offset(true)?;
                self.buffer_jump(buffer_id, offset);
            }
            BUF_OFFSET_COND_JUMP => {
                let offset = self.read_offset(true)?;
                if self.read_conditional()? {
                    self.buffer_jump(buffer_id, offset);
                }
            }
            BUF_OFFSET_CALL => {
                let offset = self.read_offset(true)?;
                self.buffer_call(buffer_id, offset);
            }
            BUF_OFFSET_COND_CALL => {
                let offset = self.read_offset(true)?;
                if self.read_conditional()? {
                    self.buffer_call(buffer_id, offset);
                }
            }
            BUF_COPY => {
                let sources = self.read_id_list()?;
                self.buffer_copy(buffer_id, &sources);
            }
            BUF_CONSOLIDATE => self.buffer_consolidate(buffer_id),
            BUF_SPLIT => {
                let length = self.read_word()?;
                self.buffer_split_into(buffer_id, length, vec![buffer_id], false);
            }
            BUF_SPLIT_INTO => {
                let length = self.read_word()?;
                let targets = self.read_id_list()?;
                self.buffer_split_into(buffer_id, length, targets, false);
            }
            BUF_SPLIT_FROM => {
                let length = self.read_word()?;
                let start = self.read_word()?;
                if start == RESERVED_ID {
                    return Ok(());
                }
                self.buffer_split_into(buffer_id, length, vec![start], true);
            }
            BUF_SPLIT_BY => {
                let width = self.read_word()?;
                let chunks = self.read_word()?;
                self.buffer_split_by_into(buffer_id, width, chunks as usize, vec![buffer_id], false);
            }
            BUF_SPLIT_BY_INTO => {
                let width = self.read_word()?;
                let targets = self.read_id_list()?;
                let chunks = targets.len();
                self.buffer_split_by_into(buffer_id, width, chunks, targets, false);
            }
            BUF_SPLIT_BY_FROM => {
                let width = self.read_word()?;
                let chunks = self.read_word()?;
                let start = self.read_word()?;
                if start == RESERVED_ID {
                    return Ok(());
                }
                self.buffer_split_by_into(buffer_id, width, chunks as usize, vec![start], true);
            }
            BUF_SPREAD_INTO => {
                let targets = self.read_id_list()?;
                self.buffer_spread_into(buffer_id, targets, false);
            }
            BUF_SPREAD_FROM => {
                let start = self.read_word()?;
                if start == RESERVED_ID {
                    return Ok(());
                }
                self.buffer_spread_into(buffer_id, vec![start], true);
            }
            BUF_REVERSE_BLOCKS => self.buffer_reverse_blocks(buffer_id),
            BUF_REVERSE => {
                let options = self.read_byte()?;
                self.buffer_reverse(buffer_id, options)?;
            }
            BUF_COPY_REF => {
                let sources = self.read_id_list()?;
                self.buffer_copy_ref(buffer_id, &sources);
            }
            BUF_COPY_AND_CONSOLIDATE => {
                let sources = self.read_id_list()?;
                self.buffer_copy_consolidate(buffer_id, &sources);
            }
            BUF_DEBUG_INFO => self.buffer_debug_info(buffer_id),
            other => {
                log::debug!("vdu_buffered: unknown command {other}, buffer {buffer_id}");
            }
        }
        Ok(())
    }

    /// Entry offset for an offset-less jump: the reserved id jumps past the
    /// end of the stream, everything else enters at the start.
    fn jump_entry(&self, buffer_id: u16) -> AdvancedOffset {
        if buffer_id == RESERVED_ID {
            AdvancedOffset::past_end()
        } else {
            AdvancedOffset::start()
        }
    }

    /// Store `length` stream bytes as one new block under `id`.
    pub(crate) fn buffer_write(&mut self, id: u16, length: usize) -> Result<usize> {
        log::debug!("buffer_write: storing {length} bytes into buffer {id}");
        let remaining = self.ctx.store.lock().write(id, length, &mut self.input);
        if remaining > 0 {
            Err(crate::error::Error::StreamShort)
        } else {
            Ok(0)
        }
    }

    /// Execute `target` as a sub-program, entering at `offset`.
    ///
    /// When this processor is itself buffer-driven and its own stream is
    /// exhausted, the call is promoted to a jump so chained programs do not
    /// nest.
    pub(crate) fn buffer_call(&mut self, target: u16, offset: AdvancedOffset) {
        let Some(id) = resolve_id(target, self.id) else {
            log::debug!("buffer_call: no buffer id");
            return;
        };
        if self.id != RESERVED_ID && self.input.available() == 0 {
            // Tail call: nothing left here, reuse this processor.
            return self.buffer_jump(id, offset);
        }
        let Some(blocks) = self.ctx.store.lock().blocks_cloned(id) else {
            log::debug!("buffer_call: buffer {id} not found");
            return;
        };
        let mut stream = MultiBlockStream::new(blocks);
        if offset != AdvancedOffset::start() {
            stream.seek(offset);
        }
        let mut nested =
            StreamProcessor::nested(stream, self.output.clone(), self.ctx.clone(), id);
        nested.run();
    }

    /// Redirect execution to `target`, entering at `offset`.
    pub(crate) fn buffer_jump(&mut self, target: u16, offset: AdvancedOffset) {
        if self.id == RESERVED_ID {
            // The top level cannot jump; degrade to a call.
            return self.buffer_call(target, offset);
        }
        if target == RESERVED_ID || target == self.id {
            // Jump within the current buffer is a seek, including the
            // "past end" address that terminates execution.
            self.input.seek(offset);
            return;
        }
        let Some(blocks) = self.ctx.store.lock().blocks_cloned(target) else {
            log::debug!("buffer_jump: buffer {target} not found");
            return;
        };
        let mut stream = MultiBlockStream::new(blocks);
        if offset != AdvancedOffset::start() {
            stream.seek(offset);
        }
        self.input = crate::stream::InputStream::Blocks(stream);
    }

    /// Point the output transport at a buffer, at nothing, or back at the
    /// original sink.
    fn set_output(&mut self, buffer_id: u16) {
        match buffer_id {
            RESERVED_ID => self.output.redirect_null(),
            0 => self.output.restore(),
            id => {
                let block = self
                    .ctx
                    .store
                    .lock()
                    .blocks(id)
                    .and_then(|blocks| blocks.first().cloned());
                match block {
                    Some(block) => {
                        self.output.redirect_to(block);
                    }
                    None => log::debug!("set_output: buffer {id} not found"),
                }
            }
        }
    }

    /// Read buffer ids until the end-of-list sentinel. A timeout mid-list
    /// aborts the command.
    pub(crate) fn read_id_list(&mut self) -> Result<Vec<u16>> {
        let mut ids = Vec::new();
        loop {
            let id = self.read_word()?;
            if id == RESERVED_ID {
                return Ok(ids);
            }
            ids.push(id);
        }
    }

    fn buffer_debug_info(&self, buffer_id: u16) {
        let store = self.ctx.store.lock();
        let Some(blocks) = store.blocks(buffer_id) else {
            log::debug!("buffer_debug_info: buffer {buffer_id} not found");
            return;
        };
        log::debug!(
            "buffer {buffer_id}: {} blocks, {} bytes",
            blocks.len(),
            store.total_size(buffer_id)
        );
        if let Some(first) = blocks.first() {
            let dump: Vec<String> = first
                .snapshot()
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect();
            log::debug!("buffer {buffer_id} block 0: {}", dump.join(" "));
        }
    }
}
