/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

/* Alternative serde Serialize / Deserialize implementations. */

pub mod duration;
