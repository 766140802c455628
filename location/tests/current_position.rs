use std::pin::pin;
use std::task::Poll;

use futures::poll;
use geokit_location::sim::{SimFix, SimSettings, SimulatedLocationService};
use geokit_location::{
    GeolocationConfig, GeolocationController, GeolocationError, LocationOptions, LocationResult,
    RawLocation, ResolutionOutcome, ServiceAvailability,
};

fn reading() -> RawLocation {
    RawLocation {
        latitude: 1.0,
        longitude: 2.0,
        altitude: 3.0,
        accuracy: 0.5,
        vertical_accuracy: Some(1.5),
        bearing: 4.0,
        speed: 0.2,
        time: 1,
    }
}

fn controller_with_fix() -> GeolocationController<SimulatedLocationService> {
    let service = SimulatedLocationService::new();
    service.set_fix(SimFix::Respond(reading()));
    GeolocationController::new(service)
}

fn options() -> LocationOptions {
    LocationOptions::new(5000)
        .with_maximum_age(3000)
        .with_high_accuracy(true)
}

#[tokio::test]
async fn satisfied_settings_fetch_directly() {
    let controller = controller_with_fix();

    let location = controller
        .get_current_position(&options())
        .await
        .expect("location");

    assert_eq!(
        location,
        LocationResult {
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
            accuracy: 0.5,
            altitude_accuracy: Some(1.5),
            heading: 4.0,
            speed: 0.2,
            timestamp: 1,
        }
    );
    let calls = controller.service().calls();
    assert_eq!(calls.settings_intervals, vec![0]);
    assert_eq!(calls.resolutions_launched, 0);
    assert_eq!(calls.fetches, 1);
}

#[tokio::test]
async fn non_positive_timeout_makes_no_platform_call() {
    let controller = controller_with_fix();

    for timeout in [0, -1, -5000] {
        let result = controller
            .get_current_position(&LocationOptions::new(timeout))
            .await;
        assert_eq!(result, Err(GeolocationError::InvalidTimeout));
    }
    assert_eq!(controller.service().calls().total(), 0);
}

#[tokio::test]
async fn unavailable_services_report_resolvability() {
    let controller = controller_with_fix();

    controller
        .service()
        .set_availability(ServiceAvailability::Resolvable("outdated".into()));
    assert_eq!(
        controller.get_current_position(&options()).await,
        Err(GeolocationError::ServiceUnavailable { resolvable: true })
    );

    controller
        .service()
        .set_availability(ServiceAvailability::Unavailable("missing".into()));
    assert_eq!(
        controller.get_current_position(&options()).await,
        Err(GeolocationError::ServiceUnavailable { resolvable: false })
    );

    let calls = controller.service().calls();
    assert!(calls.settings_intervals.is_empty());
    assert_eq!(calls.fetches, 0);
}

#[tokio::test]
async fn failed_settings_check_is_terminal() {
    let controller = controller_with_fix();
    controller
        .service()
        .set_settings(SimSettings::Failed("airplane mode".into()));

    assert_eq!(
        controller.get_current_position(&options()).await,
        Err(GeolocationError::settings("airplane mode"))
    );
    assert_eq!(controller.service().calls().fetches, 0);
}

#[tokio::test]
async fn accepted_resolution_resumes_the_request() {
    let controller = controller_with_fix();
    controller.service().set_settings(SimSettings::NeedsResolution);
    let prompts = controller.service().prompts();
    let options = options();

    let mut request = pin!(controller.get_current_position(&options));
    assert!(poll!(request.as_mut()).is_pending());
    assert!(controller.is_awaiting_resolution());
    assert!(prompts.try_recv().is_ok());

    assert!(controller.on_resolution_result(ResolutionOutcome::Accepted));
    let location = request.await.expect("location");

    assert_eq!(location.timestamp, 1);
    assert!(!controller.is_awaiting_resolution());
}

#[tokio::test]
async fn declined_resolution_fails_without_fetching() {
    let controller = controller_with_fix();
    controller.service().set_settings(SimSettings::NeedsResolution);
    let options = options();

    let mut request = pin!(controller.get_current_position(&options));
    assert!(poll!(request.as_mut()).is_pending());

    assert!(controller.on_resolution_result(ResolutionOutcome::from_accepted(false)));
    assert_eq!(request.await, Err(GeolocationError::RequestDenied));
    assert_eq!(controller.service().calls().fetches, 0);
}

#[tokio::test]
async fn overlapping_checks_get_their_own_prompt() {
    let controller = controller_with_fix();
    controller.service().set_settings(SimSettings::NeedsResolution);
    let prompts = controller.service().prompts();
    let options = options();

    let mut first = pin!(controller.get_current_position(&options));
    let mut second = pin!(controller.get_current_position(&options));
    assert!(poll!(first.as_mut()).is_pending());
    assert!(poll!(second.as_mut()).is_pending());
    assert_eq!(prompts.len(), 1);

    assert!(controller.on_resolution_result(ResolutionOutcome::Accepted));
    assert!(matches!(poll!(first.as_mut()), Poll::Ready(Ok(_))));

    assert!(poll!(second.as_mut()).is_pending());
    assert_eq!(prompts.len(), 2);
    assert!(controller.on_resolution_result(ResolutionOutcome::Declined));
    assert_eq!(second.await, Err(GeolocationError::RequestDenied));
}

#[test]
fn unsolicited_resolution_result_is_ignored() {
    let controller = controller_with_fix();
    assert!(!controller.on_resolution_result(ResolutionOutcome::Accepted));
    assert!(!controller.is_awaiting_resolution());
}

#[tokio::test]
async fn missing_fix_is_a_timeout() {
    let controller = controller_with_fix();
    controller.service().set_fix(SimFix::NoFix);

    assert_eq!(
        controller.get_current_position(&options()).await,
        Err(GeolocationError::LocationTimeout)
    );
}

#[tokio::test]
async fn hung_provider_is_cut_off_after_the_grace() {
    let service = SimulatedLocationService::new();
    service.set_fix(SimFix::Hang);
    let controller =
        GeolocationController::with_config(service, GeolocationConfig::default().with_timeout_grace(10));

    assert_eq!(
        controller
            .get_current_position(&LocationOptions::new(20))
            .await,
        Err(GeolocationError::LocationTimeout)
    );
}

#[tokio::test]
async fn provider_failure_is_propagated() {
    let controller = controller_with_fix();
    controller.service().set_fix(SimFix::Fail("gps off".into()));

    assert_eq!(
        controller.get_current_position(&options()).await,
        Err(GeolocationError::Platform("gps off".into()))
    );
}

#[tokio::test]
async fn vertical_accuracy_follows_platform_support() {
    let controller = controller_with_fix();
    controller.service().set_vertical_accuracy_supported(false);

    let location = controller
        .get_current_position(&options())
        .await
        .expect("location");
    assert_eq!(location.altitude_accuracy, None);
}

#[test]
fn location_enabled_is_a_passthrough() {
    let controller = controller_with_fix();
    assert!(controller.are_location_services_enabled());
    controller.service().set_location_enabled(false);
    assert!(!controller.are_location_services_enabled());
}
