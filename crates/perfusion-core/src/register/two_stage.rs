use tracing::debug;

use crate::edges::detect_edges_with;
use crate::error::{RegistrationStage, Result};
use crate::frame::{Image, Mask};

use super::config::RegistrationConfig;
use super::estimator::estimate_and_apply;
use super::metric::dice;
use super::resample::warp_mask;
use super::transform::SimilarityTransform;

/// Result of registering one moving frame to the fixed frame.
#[derive(Clone, Debug)]
pub struct PairRegistration {
    /// Moving image on the fixed grid after both stages.
    pub image: Image,
    /// Moving mask on the fixed grid, carried through the accepted stages.
    pub mask: Mask,
    /// Moving edge map on the fixed grid after stage two.
    pub edges: Mask,
    /// Mask-driven stage-one transform.
    pub coarse: SimilarityTransform,
    /// Edge-driven stage-two transform, applied on top of `coarse`.
    pub fine: SimilarityTransform,
    /// Dice of the stage-one edge map against the fixed edge map.
    pub coarse_dice: f64,
    /// Dice of the final edge map against the fixed edge map.
    pub fine_dice: f64,
    /// False when the stage-two result was discarded.
    pub refinement_accepted: bool,
}

impl PairRegistration {
    /// Total moving -> fixed transform.
    pub fn transform(&self) -> SimilarityTransform {
        self.coarse.then(&self.fine)
    }
}

/// Two-stage registration: masks first, then edge maps of the stage-one
/// result against `fixed_edges`.
pub fn register_pair(
    moving_image: &Image,
    fixed_image: &Image,
    moving_mask: &Mask,
    fixed_mask: &Mask,
    fixed_edges: &Mask,
    max_iterations: usize,
    config: &RegistrationConfig,
) -> Result<PairRegistration> {
    let coarse = estimate_and_apply(
        moving_image,
        fixed_image,
        moving_mask,
        fixed_mask,
        max_iterations,
        config.family,
        config,
    )
    .map_err(|e| e.at_stage(RegistrationStage::Coarse))?;

    let coarse_edges = detect_edges_with(&coarse.image, config.edge_threshold, &config.edges)
        .map_err(|e| e.at_stage(RegistrationStage::Fine))?;
    let coarse_dice = dice(&coarse_edges, fixed_edges);

    let fine = estimate_and_apply(
        &coarse.image,
        fixed_image,
        &coarse_edges,
        fixed_edges,
        max_iterations,
        config.family,
        config,
    )
    .map_err(|e| e.at_stage(RegistrationStage::Fine))?;
    let fine_dice = dice(&fine.reference, fixed_edges);

    debug!(
        coarse = %coarse.transform,
        fine = %fine.transform,
        coarse_dice,
        fine_dice,
        "pair registered"
    );

    if config.reject_worse_refinement && fine_dice < coarse_dice {
        debug!(coarse_dice, fine_dice, "edge refinement rejected");
        return Ok(PairRegistration {
            image: coarse.image,
            mask: coarse.reference,
            edges: coarse_edges,
            coarse: coarse.transform,
            fine: SimilarityTransform::identity(fixed_image.dim()),
            coarse_dice,
            fine_dice: coarse_dice,
            refinement_accepted: false,
        });
    }

    Ok(PairRegistration {
        image: fine.image,
        mask: warp_mask(&coarse.reference, &fine.transform, fixed_image.dim()),
        edges: fine.reference,
        coarse: coarse.transform,
        fine: fine.transform,
        coarse_dice,
        fine_dice,
        refinement_accepted: true,
    })
}
