use anyhow::Result;

use pace_core::models::AdaptiveModel;
use pace_core::service::CoachService;

pub(crate) fn cmd_bias_show(svc: &CoachService, json: bool) -> Result<()> {
    let model = svc.get_adaptive_model()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print_model(&model);
    }
    Ok(())
}

pub(crate) fn cmd_bias_set(svc: &CoachService, kcal: i64, json: bool) -> Result<()> {
    let model = svc.set_bias(kcal)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        println!("TDEE bias set to {:+} kcal", model.tdee_bias);
    }
    Ok(())
}

fn print_model(model: &AdaptiveModel) {
    println!("  TDEE bias:       {:+} kcal", model.tdee_bias);
    match model.last_calibration_date {
        Some(at) => println!("  Last calibrated: {}", at.to_rfc3339()),
        None => println!("  Last calibrated: never"),
    }
}
