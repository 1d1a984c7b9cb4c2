/*!
World objects the controller interacts with but does not own the physics of.

- ladder:     climbable segment with nearest-point projection
- water:      oriented water boxes for the swim transition
- push_block: boxes that can be pushed from one of four sides

Ladders and push blocks live in slot storage: removing one leaves a hole, so an id held by an
active state simply stops resolving instead of pointing at a different object.
*/

pub mod ladder;
pub mod push_block;
pub mod water;

pub use ladder::Ladder;
pub use push_block::PushBlock;
pub use water::WaterVolume;

use nalgebra::{Point3, UnitQuaternion};

/// Something that reacts to the interact key when the character overlaps it.
pub trait Interactable {
    fn interaction_contains(&self, point: Point3<f32>) -> bool;

    fn on_interact(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LadderId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

/// What an interact press resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionTarget {
    Ladder(LadderId),
    Block(BlockId),
}

#[derive(Clone, Debug, Default)]
pub struct Environment {
    ladders: Vec<Option<Ladder>>,
    blocks: Vec<Option<PushBlock>>,
    water: Vec<WaterVolume>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ladder(&mut self, ladder: Ladder) -> LadderId {
        self.ladders.push(Some(ladder));
        LadderId(self.ladders.len() - 1)
    }

    pub fn remove_ladder(&mut self, id: LadderId) -> Option<Ladder> {
        self.ladders.get_mut(id.0).and_then(Option::take)
    }

    pub fn ladder(&self, id: LadderId) -> Option<&Ladder> {
        self.ladders.get(id.0).and_then(Option::as_ref)
    }

    pub fn add_block(&mut self, block: PushBlock) -> BlockId {
        self.blocks.push(Some(block));
        BlockId(self.blocks.len() - 1)
    }

    pub fn remove_block(&mut self, id: BlockId) -> Option<PushBlock> {
        self.blocks.get_mut(id.0).and_then(Option::take)
    }

    pub fn block(&self, id: BlockId) -> Option<&PushBlock> {
        self.blocks.get(id.0).and_then(Option::as_ref)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut PushBlock> {
        self.blocks.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn add_water(&mut self, volume: WaterVolume) {
        self.water.push(volume);
    }

    pub fn water_volumes(&self) -> &[WaterVolume] {
        &self.water
    }

    /// First water volume containing `point`.
    pub fn water_containing(&self, point: Point3<f32>) -> Option<WaterVolume> {
        self.water.iter().copied().find(|volume| volume.contains(point))
    }

    /// First interactable overlapping `point`. Ladders take precedence over blocks.
    pub fn interactable_at(&self, point: Point3<f32>) -> Option<InteractionTarget> {
        let ladder = self.ladders.iter().enumerate().find_map(|(index, slot)| {
            slot.as_ref()
                .filter(|ladder| ladder.interaction_contains(point))
                .map(|_| InteractionTarget::Ladder(LadderId(index)))
        });
        ladder.or_else(|| {
            self.blocks.iter().enumerate().find_map(|(index, slot)| {
                slot.as_ref()
                    .filter(|block| block.interaction_contains(point))
                    .map(|_| InteractionTarget::Block(BlockId(index)))
            })
        })
    }

    /// Does `target` still refer to a live object?
    pub fn resolves(&self, target: InteractionTarget) -> bool {
        match target {
            InteractionTarget::Ladder(id) => self.ladder(id).is_some(),
            InteractionTarget::Block(id) => self.block(id).is_some(),
        }
    }

    /// Tell the target it was interacted with.
    pub fn notify(&mut self, target: InteractionTarget) {
        let interactable: Option<&mut dyn Interactable> = match target {
            InteractionTarget::Ladder(id) => self
                .ladders
                .get_mut(id.0)
                .and_then(Option::as_mut)
                .map(|ladder| ladder as &mut dyn Interactable),
            InteractionTarget::Block(id) => self
                .block_mut(id)
                .map(|block| block as &mut dyn Interactable),
        };
        if let Some(interactable) = interactable {
            interactable.on_interact();
        }
    }
}
