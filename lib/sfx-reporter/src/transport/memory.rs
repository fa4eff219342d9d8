/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};

use super::{DataPointReceiver, DataPointReceiverFactory};
use crate::{DataPoint, SendError};

#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedBatch {
    pub auth_token: String,
    pub data_points: Vec<DataPoint>,
}

/// Keep every received batch in memory.
#[derive(Clone, Default)]
pub struct MemoryDataPointReceiverFactory {
    store: Arc<Mutex<Vec<ReceivedBatch>>>,
}

impl MemoryDataPointReceiverFactory {
    pub fn new() -> Self {
        MemoryDataPointReceiverFactory::default()
    }

    pub fn batches(&self) -> Vec<ReceivedBatch> {
        self.store.lock().unwrap().clone()
    }

    /// All received points in arrival order.
    pub fn data_points(&self) -> Vec<DataPoint> {
        let store = self.store.lock().unwrap();
        store
            .iter()
            .flat_map(|b| b.data_points.iter().cloned())
            .collect()
    }

    /// Take all received batches, leaving the store empty.
    pub fn take(&self) -> Vec<ReceivedBatch> {
        let mut store = self.store.lock().unwrap();
        std::mem::take(&mut *store)
    }
}

impl DataPointReceiverFactory for MemoryDataPointReceiverFactory {
    fn create_receiver(&self) -> Result<Box<dyn DataPointReceiver>, SendError> {
        Ok(Box::new(MemoryDataPointReceiver {
            store: self.store.clone(),
        }))
    }
}

struct MemoryDataPointReceiver {
    store: Arc<Mutex<Vec<ReceivedBatch>>>,
}

impl DataPointReceiver for MemoryDataPointReceiver {
    fn add_data_points(
        &mut self,
        auth_token: &str,
        points: &[DataPoint],
    ) -> Result<(), SendError> {
        let mut store = self.store.lock().unwrap();
        store.push(ReceivedBatch {
            auth_token: auth_token.to_string(),
            data_points: points.to_vec(),
        });
        Ok(())
    }
}
