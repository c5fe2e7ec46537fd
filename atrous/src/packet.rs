//! Wavelet packet transform: a decomposition tree grown under a stop policy.
//!
//! Unlike the pyramid, every sub-band may be decomposed again. Leaves are
//! emitted in pre-order: the `2^N` children of a decomposed node, each with
//! its own sub-tree expanded, come before the node's next sibling. The shape
//! of the tree is recorded as a packet rule, one flag per visited node in
//! the same pre-order, `true` for a decomposed node and `false` for a leaf.

use std::borrow::Cow;
use std::slice;

use log::{debug, error, info};

use crate::cost::StopPolicy;
use crate::error::WaveletError;
use crate::filter_bank::{number_of_sub_bands, rescaled_observer, StationaryFilterBank};
use crate::kernel::Direction;
use crate::raster::Raster;
use crate::settings::TransformSettings;

pub struct WaveletPacketTransform {
    settings: TransformSettings,
    cost: Option<Box<dyn StopPolicy>>,
    filter_list: Vec<StationaryFilterBank>,
    packet_rule: Vec<bool>,
}

impl WaveletPacketTransform {
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            settings,
            cost: None,
            filter_list: Vec::new(),
            packet_rule: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn set_cost<C: StopPolicy + 'static>(&mut self, cost: C) {
        self.cost = Some(Box::new(cost));
    }

    pub fn set_boxed_cost(&mut self, cost: Box<dyn StopPolicy>) {
        self.cost = Some(cost);
    }

    pub fn has_cost(&self) -> bool {
        self.cost.is_some()
    }

    /// One filter bank per node decomposed by the last computation, in pre-order
    pub fn filter_list(&self) -> &[StationaryFilterBank] {
        &self.filter_list
    }

    /// Tree shape of the last computation
    pub fn packet_rule(&self) -> &[bool] {
        &self.packet_rule
    }

    /// Decompose `input` and return the leaves in pre-order.
    pub fn compute(
        &mut self,
        input: &Raster,
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        self.run(input, observer).inspect_err(|e| {
            error!("wavelet packet transform failed: {}", e);
        })
    }

    fn run(
        &mut self,
        input: &Raster,
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        self.filter_list.clear();
        self.packet_rule.clear();
        let cost = match &self.cost {
            Some(cost) => &**cost,
            None => return Err(WaveletError::CostPolicyNotSet),
        };
        self.settings.validate()?;
        if input.region().is_empty() {
            return Err(WaveletError::EmptyRaster);
        }

        let mut tree = Decomposition {
            cost,
            settings: &self.settings,
            observer,
            children: number_of_sub_bands(input.dimension()),
            filter_list: Vec::new(),
            packet_rule: Vec::new(),
            leaves: Vec::new(),
        };
        tree.perform_decomposition(0, Cow::Borrowed(input), 0.0, 1.0)?;
        info!(
            "packet tree with {} decomposed nodes and {} leaves",
            tree.filter_list.len(),
            tree.leaves.len()
        );

        let leaves = tree.leaves;
        self.filter_list = tree.filter_list;
        self.packet_rule = tree.packet_rule;
        Ok(leaves)
    }
}

struct Decomposition<'a> {
    cost: &'a dyn StopPolicy,
    settings: &'a TransformSettings,
    observer: Option<&'a (dyn Fn(f32) + Sync)>,
    children: usize,
    filter_list: Vec<StationaryFilterBank>,
    packet_rule: Vec<bool>,
    leaves: Vec<Raster>,
}

impl Decomposition<'_> {
    /// Progress of this node covers `start..start + span`: the node's own
    /// filter bank gets the first share, each child one of the remaining ones.
    fn perform_decomposition(
        &mut self,
        depth: u32,
        subband: Cow<'_, Raster>,
        start: f32,
        span: f32,
    ) -> Result<(), WaveletError> {
        if !self.cost.evaluate(depth, &subband) {
            debug!("node at depth {} kept as leaf", depth);
            self.packet_rule.push(false);
            self.leaves.push(subband.into_owned());
            if let Some(observer) = self.observer {
                observer(start + span);
            }
            return Ok(());
        }

        let bank = StationaryFilterBank::with_settings(
            self.settings,
            Direction::Forward,
            self.settings.up_sample_factor_at(depth),
        );
        let share = span / (self.children + 1) as f32;
        let scaled = rescaled_observer(self.observer, start, share);
        let bands = bank.forward(&subband, scaled.as_ref().map(|f| f as &(dyn Fn(f32) + Sync)))?;
        drop(subband);
        debug!("node at depth {} decomposed into {} sub-bands", depth, bands.len());
        self.packet_rule.push(true);
        self.filter_list.push(bank);

        for (i, band) in bands.into_iter().enumerate() {
            let child_start = start + share * (i + 1) as f32;
            self.perform_decomposition(depth + 1, Cow::Owned(band), child_start, share)?;
        }
        Ok(())
    }
}

/// Rebuilds a raster from the leaves and packet rule of a [`WaveletPacketTransform`].
#[derive(Debug, Clone, Default)]
pub struct WaveletPacketInverseTransform {
    settings: TransformSettings,
}

impl WaveletPacketInverseTransform {
    pub fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn compute(
        &self,
        leaves: &[Raster],
        packet_rule: &[bool],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Raster, WaveletError> {
        self.run(leaves, packet_rule, observer).inspect_err(|e| {
            error!("wavelet packet inverse transform failed: {}", e);
        })
    }

    fn run(
        &self,
        leaves: &[Raster],
        packet_rule: &[bool],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Raster, WaveletError> {
        self.settings.validate()?;
        let mismatch = WaveletError::PacketRuleMismatch {
            rule_length: packet_rule.len(),
            leaves: leaves.len(),
        };
        let dimension = match leaves.first() {
            Some(leaf) => leaf.dimension(),
            None => return Err(mismatch),
        };

        let mut tree = Reconstruction {
            settings: &self.settings,
            observer,
            children: number_of_sub_bands(dimension),
            nodes: packet_rule.iter().filter(|&&decomposed| decomposed).count(),
            done: 0,
            leaves: leaves.iter(),
            rule: packet_rule.iter(),
        };
        let root = tree.rebuild(0)?.ok_or_else(|| mismatch.clone())?;
        if tree.leaves.next().is_some() || tree.rule.next().is_some() {
            return Err(mismatch);
        }
        if tree.nodes == 0 {
            if let Some(observer) = observer {
                observer(1.0);
            }
        }
        Ok(root.into_owned())
    }
}

struct Reconstruction<'a> {
    settings: &'a TransformSettings,
    observer: Option<&'a (dyn Fn(f32) + Sync)>,
    children: usize,
    nodes: usize,
    done: usize,
    leaves: slice::Iter<'a, Raster>,
    rule: slice::Iter<'a, bool>,
}

impl<'a> Reconstruction<'a> {
    /// `None` when the rule or the leaves run out early.
    fn rebuild(&mut self, depth: u32) -> Result<Option<Cow<'a, Raster>>, WaveletError> {
        match self.rule.next() {
            None => Ok(None),
            Some(false) => Ok(self.leaves.next().map(Cow::Borrowed)),
            Some(true) => {
                let mut children = Vec::with_capacity(self.children);
                for _ in 0..self.children {
                    match self.rebuild(depth + 1)? {
                        Some(child) => children.push(child),
                        None => return Ok(None),
                    }
                }
                let sub_bands: Vec<&Raster> = children.iter().map(|child| &**child).collect();

                let bank = StationaryFilterBank::with_settings(
                    self.settings,
                    Direction::Inverse,
                    self.settings.up_sample_factor_at(depth),
                );
                let share = 1.0 / self.nodes as f32;
                let scaled = rescaled_observer(self.observer, self.done as f32 * share, share);
                let reconstructed =
                    bank.inverse(&sub_bands, scaled.as_ref().map(|f| f as &(dyn Fn(f32) + Sync)))?;
                self.done += 1;
                Ok(Some(Cow::Owned(reconstructed)))
            }
        }
    }
}
